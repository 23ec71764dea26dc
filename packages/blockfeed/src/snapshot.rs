//! Feed Snapshots
//!
//! What the display layer sees. The poller publishes an immutable
//! `FeedSnapshot` after every tick through a watch channel; readers hold a
//! `FeedHandle` and never touch the poller's state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::feed::unique_block_count;
use crate::registry::is_live;
use crate::transaction::ClassifiedTransaction;

/// Poller health and progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStatus {
    /// Last block applied to the feed, `None` until the first one lands
    pub current_block: Option<u64>,
    /// Cleared while consecutive fetches are failing
    pub healthy: bool,
    /// Blocks applied this session
    pub blocks_processed: u64,
    /// Message of the most recent failure, cleared on recovery
    pub last_error: Option<String>,
    /// Delay before the next tick
    pub next_poll_in: Duration,
}

impl FeedStatus {
    pub(crate) fn initial(next_poll_in: Duration) -> Self {
        Self {
            current_block: None,
            healthy: true,
            blocks_processed: 0,
            last_error: None,
            next_poll_in,
        }
    }

    /// No block has been applied yet
    pub fn is_loading(&self) -> bool {
        self.current_block.is_none()
    }
}

/// An immutable view of the feed at one point in time
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    entries: Vec<ClassifiedTransaction>,
    status: FeedStatus,
    fresh: HashMap<TxHash, Instant>,
}

impl FeedSnapshot {
    pub(crate) fn new(
        entries: Vec<ClassifiedTransaction>,
        status: FeedStatus,
        fresh: HashMap<TxHash, Instant>,
    ) -> Self {
        Self { entries, status, fresh }
    }

    pub(crate) fn empty(next_poll_in: Duration) -> Self {
        Self::new(Vec::new(), FeedStatus::initial(next_poll_in), HashMap::new())
    }

    /// Entries, newest first
    pub fn entries(&self) -> &[ClassifiedTransaction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn unique_block_count(&self) -> usize {
        unique_block_count(&self.entries)
    }

    pub fn status(&self) -> &FeedStatus {
        &self.status
    }

    pub fn current_block(&self) -> Option<u64> {
        self.status.current_block
    }

    pub fn is_healthy(&self) -> bool {
        self.status.healthy
    }

    /// Whether `hash` arrived within the fresh window.
    ///
    /// Checked against the clock now, not when the snapshot was taken.
    pub fn is_fresh(&self, hash: &TxHash) -> bool {
        is_live(&self.fresh, hash, Instant::now())
    }

    /// Serialize entries for a consumer that wants JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let messages: Vec<FeedEntryMessage> = self.entries.iter().map(FeedEntryMessage::from).collect();
        serde_json::to_string(&messages)
    }
}

/// JSON shape of one feed entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntryMessage {
    /// Transaction hash with 0x prefix
    pub hash: String,
    /// Sender address
    pub from: String,
    /// Recipient address, null for contract creation
    pub to: Option<String>,
    /// Value in wei as decimal string
    pub value: String,
    /// Human-readable category, e.g. "ERC20 Transfer"
    pub tx_type: String,
    /// Block the transaction was included in
    pub block_number: u64,
    /// Block time in unix milliseconds
    pub timestamp: u64,
}

impl From<&ClassifiedTransaction> for FeedEntryMessage {
    fn from(tx: &ClassifiedTransaction) -> Self {
        Self {
            hash: format!("{:#x}", tx.hash),
            from: format!("{:#x}", tx.from),
            to: tx.to.map(|a| format!("{:#x}", a)),
            value: tx.value.to_string(),
            tx_type: tx.tx_type().label().to_string(),
            block_number: tx.block_number,
            timestamp: tx.timestamp_millis,
        }
    }
}

/// Read side of the feed
#[derive(Debug, Clone)]
pub struct FeedHandle {
    rx: watch::Receiver<Arc<FeedSnapshot>>,
}

impl FeedHandle {
    pub(crate) fn new(rx: watch::Receiver<Arc<FeedSnapshot>>) -> Self {
        Self { rx }
    }

    /// The latest published snapshot
    pub fn snapshot(&self) -> Arc<FeedSnapshot> {
        Arc::clone(&*self.rx.borrow())
    }

    /// Wait for the next snapshot.
    ///
    /// # Returns
    /// `false` once the poller has gone away
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256, Address, Bytes, U256};

    fn entry(block_number: u64, to: Option<Address>, input: Vec<u8>) -> ClassifiedTransaction {
        ClassifiedTransaction {
            hash: b256!("1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef"),
            from: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            to,
            value: U256::from(1_000_000_000_000_000_000u64),
            input: Bytes::from(input),
            block_number,
            timestamp_millis: 1_703_000_000_000,
        }
    }

    fn status(current_block: Option<u64>) -> FeedStatus {
        FeedStatus {
            current_block,
            healthy: true,
            blocks_processed: 1,
            last_error: None,
            next_poll_in: Duration::from_millis(2000),
        }
    }

    // ==================== FeedEntryMessage tests ====================

    #[test]
    fn test_message_from_transaction() {
        let tx = entry(42, Some(address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D")), vec![0xa9, 0x05, 0x9c, 0xbb]);
        let message = FeedEntryMessage::from(&tx);

        assert_eq!(message.hash.len(), 66);
        assert!(message.from.starts_with("0x"));
        assert_eq!(message.to.as_deref().map(str::len), Some(42));
        assert_eq!(message.value, "1000000000000000000");
        assert_eq!(message.tx_type, "ERC20 Transfer");
        assert_eq!(message.block_number, 42);
        assert_eq!(message.timestamp, 1_703_000_000_000);
    }

    #[test]
    fn test_message_contract_creation_has_null_to() {
        let tx = entry(1, None, vec![0x60, 0x80]);
        let message = FeedEntryMessage::from(&tx);
        assert_eq!(message.to, None);
        assert_eq!(message.tx_type, "Contract Creation");
    }

    #[test]
    fn test_snapshot_json_uses_camel_case() {
        let snapshot = FeedSnapshot::new(vec![entry(7, Some(Address::ZERO), vec![])], status(Some(7)), HashMap::new());
        let json = snapshot.to_json().unwrap();

        assert!(json.contains("\"txType\":\"ETH Transfer\""));
        assert!(json.contains("\"blockNumber\":7"));

        let parsed: Vec<FeedEntryMessage> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].block_number, 7);
    }

    // ==================== FeedSnapshot tests ====================

    #[test]
    fn test_empty_snapshot_status() {
        let snapshot = FeedSnapshot::empty(Duration::from_millis(2000));
        assert!(snapshot.is_empty());
        assert!(snapshot.is_healthy());
        assert!(snapshot.status().is_loading());
        assert_eq!(snapshot.current_block(), None);
        assert_eq!(snapshot.unique_block_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_fresh_marks_expire_after_publication() {
        let hash = TxHash::repeat_byte(0x42);
        let mut fresh = HashMap::new();
        fresh.insert(hash, Instant::now() + Duration::from_millis(500));
        let snapshot = FeedSnapshot::new(Vec::new(), status(Some(1)), fresh);

        assert!(snapshot.is_fresh(&hash));
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(!snapshot.is_fresh(&hash));
    }

    #[tokio::test]
    async fn test_handle_sees_published_snapshot() {
        let (tx, rx) = watch::channel(Arc::new(FeedSnapshot::empty(Duration::from_millis(2000))));
        let mut handle = FeedHandle::new(rx);

        tx.send(Arc::new(FeedSnapshot::new(vec![entry(9, None, vec![])], status(Some(9)), HashMap::new())))
            .unwrap();

        assert!(handle.changed().await);
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.current_block(), Some(9));
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_handle_changed_false_after_sender_dropped() {
        let (tx, rx) = watch::channel(Arc::new(FeedSnapshot::empty(Duration::from_millis(2000))));
        let mut handle = FeedHandle::new(rx);
        drop(tx);
        assert!(!handle.changed().await);
    }
}
