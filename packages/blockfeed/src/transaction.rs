//! Classified Transactions
//!
//! The feed's unit of display: the fields of a source transaction we keep,
//! stamped with its block and the block's time. Immutable once built.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use thiserror::Error;

use crate::classifier::{classify, extract_selector, TxType};
use crate::source::RawTransaction;

/// Errors that can occur while parsing hex payloads
#[derive(Error, Debug)]
pub enum HexError {
    #[error("Invalid hex payload: {0}")]
    Invalid(#[from] hex::FromHexError),
}

/// A transaction accepted into the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedTransaction {
    /// Transaction hash
    pub hash: TxHash,
    /// Sender address
    pub from: Address,
    /// Recipient address (None for contract creation)
    pub to: Option<Address>,
    /// Value in wei
    pub value: U256,
    /// Calldata
    pub input: Bytes,
    /// Block the transaction was included in
    pub block_number: u64,
    /// Block time in unix milliseconds
    pub timestamp_millis: u64,
}

impl ClassifiedTransaction {
    /// Build from a source transaction and the block it arrived in
    ///
    /// The transaction's own block number wins if the source reports one.
    pub fn from_raw(tx: &RawTransaction, block_number: u64, block_timestamp: u64) -> Self {
        Self {
            hash: tx.hash,
            from: tx.from,
            to: tx.to,
            value: tx.value,
            input: tx.input.clone(),
            block_number: tx.block_number.unwrap_or(block_number),
            timestamp_millis: block_timestamp.saturating_mul(1000),
        }
    }

    /// Category of this transaction, recomputed on every call
    pub fn tx_type(&self) -> TxType {
        classify(self.to.as_ref(), &self.input)
    }

    /// Get the selector as a hex string with 0x prefix
    pub fn selector_hex(&self) -> Option<String> {
        extract_selector(&self.input).map(|id| format!("0x{}", hex::encode(id)))
    }
}

/// Parse a hex string to bytes (with or without 0x prefix, any case)
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let hex_str = hex_str
        .strip_prefix("0x")
        .or_else(|| hex_str.strip_prefix("0X"))
        .unwrap_or(hex_str);
    Ok(hex::decode(hex_str)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};

    fn raw(to: Option<Address>, input: Vec<u8>, block_number: Option<u64>) -> RawTransaction {
        RawTransaction {
            hash: b256!("1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef"),
            from: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            to,
            value: U256::from(1_000_000_000_000_000_000u64),
            input: Bytes::from(input),
            block_number,
        }
    }

    // ==================== from_raw tests ====================

    #[test]
    fn test_from_raw_copies_fields() {
        let to = address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D");
        let tx = raw(Some(to), vec![0xa9, 0x05, 0x9c, 0xbb], Some(100));

        let classified = ClassifiedTransaction::from_raw(&tx, 100, 1_703_000_000);

        assert_eq!(classified.hash, tx.hash);
        assert_eq!(classified.from, tx.from);
        assert_eq!(classified.to, Some(to));
        assert_eq!(classified.value, tx.value);
        assert_eq!(classified.input, tx.input);
        assert_eq!(classified.block_number, 100);
    }

    #[test]
    fn test_from_raw_converts_seconds_to_millis() {
        let tx = raw(None, vec![], Some(1));
        let classified = ClassifiedTransaction::from_raw(&tx, 1, 1_703_000_000);
        assert_eq!(classified.timestamp_millis, 1_703_000_000_000);
    }

    #[test]
    fn test_from_raw_falls_back_to_block_number() {
        let tx = raw(None, vec![], None);
        let classified = ClassifiedTransaction::from_raw(&tx, 77, 0);
        assert_eq!(classified.block_number, 77);
    }

    // ==================== tx_type tests ====================

    #[test]
    fn test_tx_type_follows_shape() {
        let to = Some(Address::repeat_byte(0x11));
        let transfer = ClassifiedTransaction::from_raw(&raw(to, vec![], None), 1, 0);
        let creation = ClassifiedTransaction::from_raw(&raw(None, vec![0x60, 0x80], None), 1, 0);
        let approve =
            ClassifiedTransaction::from_raw(&raw(to, vec![0x09, 0x5e, 0xa7, 0xb3, 0x00], None), 1, 0);

        assert_eq!(transfer.tx_type(), TxType::EthTransfer);
        assert_eq!(creation.tx_type(), TxType::ContractCreation);
        assert_eq!(approve.tx_type(), TxType::Erc20Approve);
    }

    #[test]
    fn test_selector_hex() {
        let tx = raw(Some(Address::ZERO), vec![0x38, 0xed, 0x17, 0x39, 0x00], None);
        let classified = ClassifiedTransaction::from_raw(&tx, 1, 0);
        assert_eq!(classified.selector_hex(), Some("0x38ed1739".to_string()));
    }

    #[test]
    fn test_selector_hex_none_for_empty_input() {
        let tx = raw(Some(Address::ZERO), vec![], None);
        let classified = ClassifiedTransaction::from_raw(&tx, 1, 0);
        assert_eq!(classified.selector_hex(), None);
    }

    // ==================== hex_to_bytes tests ====================

    #[test]
    fn test_hex_to_bytes_with_prefix() {
        let result = hex_to_bytes("0xa9059cbb").unwrap();
        assert_eq!(result, vec![0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn test_hex_to_bytes_without_prefix() {
        let result = hex_to_bytes("a9059cbb").unwrap();
        assert_eq!(result, vec![0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn test_hex_to_bytes_uppercase() {
        let result = hex_to_bytes("0XA9059CBB").unwrap();
        assert_eq!(result, vec![0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn test_hex_to_bytes_empty() {
        assert_eq!(hex_to_bytes("0x").unwrap(), Vec::<u8>::new());
        assert_eq!(hex_to_bytes("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_hex_to_bytes_invalid() {
        assert!(hex_to_bytes("0xGGGG").is_err());
    }
}
