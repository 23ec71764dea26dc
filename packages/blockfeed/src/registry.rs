//! Dedup and Fresh-Arrival Registry
//!
//! Two independent structures owned by the poller:
//! - the set of block numbers already committed to the feed, insert-only for
//!   the life of the session;
//! - short-lived "just arrived" marks on transaction hashes, each with its own
//!   deadline, used only for highlighting.
//!
//! Fresh marks are expired lazily: a mark whose deadline has passed reads as
//! absent immediately, and is physically dropped on the next mutation.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use alloy::primitives::TxHash;
use tokio::time::Instant;

/// How long a transaction stays marked as freshly arrived
pub const DEFAULT_FRESH_TTL_MS: u64 = 500;

/// Per-hash expiring marks
#[derive(Debug, Clone)]
pub struct FreshMarks {
    ttl: Duration,
    deadlines: HashMap<TxHash, Instant>,
    // Insertion order is deadline order since the ttl is fixed
    expiry_queue: VecDeque<(Instant, TxHash)>,
}

impl FreshMarks {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            deadlines: HashMap::new(),
            expiry_queue: VecDeque::new(),
        }
    }

    /// Mark a hash as freshly arrived; it expires `ttl` from now.
    ///
    /// Re-marking a hash pushes its deadline out.
    pub fn mark(&mut self, hash: TxHash) {
        let now = Instant::now();
        self.prune_at(now);
        let deadline = now + self.ttl;
        self.deadlines.insert(hash, deadline);
        self.expiry_queue.push_back((deadline, hash));
    }

    /// Whether `hash` is still within its marking window
    pub fn is_fresh(&self, hash: &TxHash) -> bool {
        is_live(&self.deadlines, hash, Instant::now())
    }

    /// Drop every mark whose deadline has passed
    pub fn prune(&mut self) {
        self.prune_at(Instant::now());
    }

    fn prune_at(&mut self, now: Instant) {
        while let Some(&(deadline, hash)) = self.expiry_queue.front() {
            if deadline > now {
                break;
            }
            self.expiry_queue.pop_front();
            // A later re-mark of the same hash owns a newer queue entry
            if self.deadlines.get(&hash) == Some(&deadline) {
                self.deadlines.remove(&hash);
            }
        }
    }

    /// Number of live marks
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.deadlines.values().filter(|d| **d > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live marks with their deadlines, for handing to readers
    pub fn deadlines(&mut self) -> HashMap<TxHash, Instant> {
        self.prune();
        self.deadlines.clone()
    }
}

/// Deadline check shared with snapshots
pub(crate) fn is_live(deadlines: &HashMap<TxHash, Instant>, hash: &TxHash, now: Instant) -> bool {
    deadlines.get(hash).is_some_and(|deadline| *deadline > now)
}

/// Processed-block set plus fresh-arrival marks
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    processed: HashSet<u64>,
    fresh: FreshMarks,
}

impl BlockRegistry {
    pub fn new(fresh_ttl: Duration) -> Self {
        Self {
            processed: HashSet::new(),
            fresh: FreshMarks::new(fresh_ttl),
        }
    }

    /// Record a block as committed.
    ///
    /// # Returns
    /// `true` if the block was not seen before, `false` if it is a repeat
    pub fn mark_processed(&mut self, block_number: u64) -> bool {
        self.processed.insert(block_number)
    }

    pub fn is_processed(&self, block_number: u64) -> bool {
        self.processed.contains(&block_number)
    }

    /// Number of blocks committed this session
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Fire-and-forget; the mark expires on its own
    pub fn mark_fresh(&mut self, hash: TxHash) {
        self.fresh.mark(hash);
    }

    pub fn is_fresh(&self, hash: &TxHash) -> bool {
        self.fresh.is_fresh(hash)
    }

    pub fn fresh_mut(&mut self) -> &mut FreshMarks {
        &mut self.fresh
    }
}
