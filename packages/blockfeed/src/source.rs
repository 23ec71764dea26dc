//! Chain Data Source
//!
//! The seam between the poller and whatever serves blocks. The poller only
//! needs two reads: the latest block and a block by number, both with full
//! transactions.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

/// Errors a data source can report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Network or RPC failure; retried on a later tick
    #[error("Data source unavailable: {0}")]
    Unavailable(String),

    /// The requested block has not been produced yet
    #[error("Block not found: {0}")]
    NotFound(u64),

    /// The source answered with something we couldn't interpret
    #[error("Malformed data from source: {0}")]
    Malformed(String),
}

impl SourceError {
    /// `true` when the block simply isn't there yet, as opposed to a failure
    pub fn is_not_yet(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }
}

/// A transaction as served by the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    /// Transaction hash
    pub hash: TxHash,
    /// Sender address
    pub from: Address,
    /// Recipient address (None for contract creation)
    pub to: Option<Address>,
    /// Value in wei
    pub value: U256,
    /// Calldata, possibly empty
    pub input: Bytes,
    /// Containing block, if the source reports it
    pub block_number: Option<u64>,
}

/// A block as served by the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block number; `None` for an unconfirmed tip
    pub number: Option<u64>,
    /// Unix timestamp in seconds
    pub timestamp: u64,
    /// Transactions in block order
    pub transactions: Vec<RawTransaction>,
}

/// A source of full blocks
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetches the current tip with its transactions.
    async fn fetch_latest_block(&self) -> Result<Block, SourceError>;

    /// Fetches block `number` with its transactions. Returns
    /// `SourceError::NotFound` if the block hasn't been produced yet.
    async fn fetch_block_by_number(&self, number: u64) -> Result<Block, SourceError>;
}
