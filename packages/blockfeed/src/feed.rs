//! Bounded Feed Buffer
//!
//! Newest-first list of classified transactions, capped at a fixed size.
//! Each block's batch is prepended as a unit, keeping its intra-block order,
//! and whatever falls off the tail is gone.

use std::collections::HashSet;

use crate::transaction::ClassifiedTransaction;

/// Maximum number of transactions kept for display
pub const DEFAULT_FEED_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct FeedBuffer {
    capacity: usize,
    entries: Vec<ClassifiedTransaction>,
}

impl Default for FeedBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }
}

impl FeedBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Prepend a block's transactions ahead of everything already held,
    /// then evict from the tail down to capacity.
    pub fn insert_batch(&mut self, batch: Vec<ClassifiedTransaction>) {
        if batch.is_empty() {
            return;
        }
        let mut combined = batch;
        combined.truncate(self.capacity);
        let room = self.capacity - combined.len();
        combined.extend(self.entries.drain(..).take(room));
        self.entries = combined;
    }

    /// Copy of the current entries, newest first
    pub fn snapshot(&self) -> Vec<ClassifiedTransaction> {
        self.entries.clone()
    }

    pub fn entries(&self) -> &[ClassifiedTransaction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct blocks represented in the buffer
    pub fn unique_block_count(&self) -> usize {
        unique_block_count(&self.entries)
    }
}

pub(crate) fn unique_block_count(entries: &[ClassifiedTransaction]) -> usize {
    entries
        .iter()
        .map(|tx| tx.block_number)
        .collect::<HashSet<_>>()
        .len()
}
