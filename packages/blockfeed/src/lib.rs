//! Blockfeed Library
//!
//! This crate polls a chain node for new blocks, classifies every transaction
//! by what it does, and keeps a bounded newest-first feed of them. Gaps between
//! polls are filled block by block, each block is applied at most once, and a
//! failing node is retried with capped exponential backoff while the last good
//! feed stays visible.

pub mod backoff;
pub mod classifier;
pub mod config;
pub mod display;
pub mod feed;
pub mod poller;
pub mod registry;
pub mod rpc;
pub mod snapshot;
pub mod source;
pub mod transaction;

// Re-export commonly used types
pub use backoff::Backoff;
pub use classifier::{classify, classify_hex, TxType};
pub use config::{ConfigError, PollerConfig};
pub use feed::FeedBuffer;
pub use poller::{Phase, Poller, PollerHandle, TickOutcome};
pub use registry::{BlockRegistry, FreshMarks};
pub use rpc::{ConnectError, RpcSource};
pub use snapshot::{FeedEntryMessage, FeedHandle, FeedSnapshot, FeedStatus};
pub use source::{Block, DataSource, RawTransaction, SourceError};
pub use transaction::ClassifiedTransaction;
