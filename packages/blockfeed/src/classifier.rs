//! Transaction Classification
//!
//! Maps a transaction's shape (`to`, `input`) to a semantic category.
//! Known 4-byte selectors cover ERC-20, common NFT transfer variants and the
//! popular swap routers; anything else with calldata is a generic contract call.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use alloy::primitives::Address;

use crate::transaction::hex_to_bytes;

/// The 7 categories a transaction can fall into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxType {
    /// Plain value transfer, empty calldata
    EthTransfer,
    /// No recipient
    ContractCreation,
    /// transfer / transferFrom
    Erc20Transfer,
    /// approve
    Erc20Approve,
    /// safeTransferFrom variants (ERC-721 and ERC-1155)
    NftTransfer,
    /// Known router entrypoints
    Swap,
    /// Anything with calldata we don't recognise
    ContractCall,
}

impl TxType {
    /// All categories, in display order
    pub const ALL: [TxType; 7] = [
        TxType::EthTransfer,
        TxType::ContractCreation,
        TxType::Erc20Transfer,
        TxType::Erc20Approve,
        TxType::NftTransfer,
        TxType::Swap,
        TxType::ContractCall,
    ];

    /// Returns the human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            TxType::EthTransfer => "ETH Transfer",
            TxType::ContractCreation => "Contract Creation",
            TxType::Erc20Transfer => "ERC20 Transfer",
            TxType::Erc20Approve => "ERC20 Approve",
            TxType::NftTransfer => "NFT Transfer",
            TxType::Swap => "Swap",
            TxType::ContractCall => "Contract Call",
        }
    }

    /// Returns the emoji used when rendering a feed row
    pub fn emoji(&self) -> &'static str {
        match self {
            TxType::EthTransfer => "💸",
            TxType::ContractCreation => "📝",
            TxType::Erc20Transfer => "🪙",
            TxType::Erc20Approve => "✅",
            TxType::NftTransfer => "💎",
            TxType::Swap => "🔄",
            TxType::ContractCall => "⚡",
        }
    }

    /// Returns the SCREAMING_SNAKE identifier, e.g. `ERC20_TRANSFER`
    pub fn code(&self) -> &'static str {
        match self {
            TxType::EthTransfer => "ETH_TRANSFER",
            TxType::ContractCreation => "CONTRACT_CREATION",
            TxType::Erc20Transfer => "ERC20_TRANSFER",
            TxType::Erc20Approve => "ERC20_APPROVE",
            TxType::NftTransfer => "NFT_TRANSFER",
            TxType::Swap => "SWAP",
            TxType::ContractCall => "CONTRACT_CALL",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Static lookup table for known selectors
static SELECTORS: LazyLock<HashMap<[u8; 4], TxType>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    // transfer(address,uint256)
    map.insert([0xa9, 0x05, 0x9c, 0xbb], TxType::Erc20Transfer);
    // transferFrom(address,address,uint256)
    map.insert([0x23, 0xb8, 0x72, 0xdd], TxType::Erc20Transfer);
    // approve(address,uint256)
    map.insert([0x09, 0x5e, 0xa7, 0xb3], TxType::Erc20Approve);
    // safeTransferFrom(address,address,uint256)
    map.insert([0x42, 0x84, 0x2e, 0x0e], TxType::NftTransfer);
    // safeTransferFrom(address,address,uint256,bytes)
    map.insert([0xb8, 0x8d, 0x4f, 0xde], TxType::NftTransfer);
    // ERC-1155 safeTransferFrom(address,address,uint256,uint256,bytes)
    map.insert([0xf2, 0x42, 0x43, 0x2a], TxType::NftTransfer);
    // Universal Router execute(bytes,bytes[],uint256)
    map.insert([0x35, 0x93, 0x56, 0x4c], TxType::Swap);
    // SwapRouter02 exactInputSingle
    map.insert([0x04, 0xe4, 0x5a, 0xaf], TxType::Swap);
    // SwapRouter02 multicall(uint256,bytes[])
    map.insert([0x5a, 0xe4, 0x01, 0xdc], TxType::Swap);
    // MetaMask swap router
    map.insert([0x5f, 0x57, 0x55, 0x29], TxType::Swap);
    // 1inch AggregationRouter swap
    map.insert([0x12, 0xaa, 0x3c, 0xaf], TxType::Swap);
    map
});

/// Extract the 4-byte selector from transaction input data
///
/// # Returns
/// `Some([u8; 4])` if input has at least 4 bytes, `None` otherwise
pub fn extract_selector(input: &[u8]) -> Option<[u8; 4]> {
    input.get(..4)?.try_into().ok()
}

/// Look up a selector in the known table
pub fn lookup_selector(selector: &[u8; 4]) -> Option<TxType> {
    SELECTORS.get(selector).copied()
}

/// Classify a transaction by recipient and calldata
///
/// Checked in order: missing recipient is a contract creation, empty calldata
/// is a plain transfer, then the selector table, falling back to
/// `ContractCall`. Never fails.
pub fn classify(to: Option<&Address>, input: &[u8]) -> TxType {
    if to.is_none() {
        return TxType::ContractCreation;
    }
    if input.is_empty() {
        return TxType::EthTransfer;
    }
    extract_selector(input)
        .and_then(|selector| lookup_selector(&selector))
        .unwrap_or(TxType::ContractCall)
}

/// Classify with hex-encoded calldata (`"0x"`-prefixed or bare, any case)
///
/// Only the first 8 hex digits are read, so whatever follows the selector
/// doesn't need to be well-formed. A prefix that isn't valid hex can't match
/// a selector and classifies as a contract call.
pub fn classify_hex(to: Option<&Address>, input_hex: &str) -> TxType {
    if to.is_none() {
        return TxType::ContractCreation;
    }
    let digits = input_hex
        .strip_prefix("0x")
        .or_else(|| input_hex.strip_prefix("0X"))
        .unwrap_or(input_hex);
    if digits.is_empty() {
        return TxType::EthTransfer;
    }

    digits
        .get(..8)
        .and_then(|prefix| hex_to_bytes(prefix).ok())
        .and_then(|bytes| extract_selector(&bytes))
        .and_then(|selector| lookup_selector(&selector))
        .unwrap_or(TxType::ContractCall)
}
