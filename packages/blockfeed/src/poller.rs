//! Reconciling Poller
//!
//! The single task that owns all feed state. On every tick it either
//! bootstraps from the latest block or walks forward from the last applied
//! block to the current tip, a bounded number of blocks at a time, applying
//! each block's transactions to the feed exactly once.
//!
//! Failures never escape a tick: they mark the poller degraded and double the
//! delay before the next one. The next tick is only armed once the current one
//! has finished, so there is never more than one tick in flight.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::config::PollerConfig;
use crate::feed::FeedBuffer;
use crate::registry::BlockRegistry;
use crate::snapshot::{FeedHandle, FeedSnapshot, FeedStatus};
use crate::source::{Block, DataSource, SourceError};
use crate::transaction::ClassifiedTransaction;

/// Where the poller is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No block applied yet; ticks look at the latest block only
    Bootstrap,
    /// Ticks walk forward from the last applied block
    Steady,
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing new to apply
    Idle,
    /// Blocks applied, in the order they were applied
    Applied(Vec<u64>),
    /// A fetch failed. Blocks applied earlier in the same tick stay applied.
    Failed { applied: Vec<u64>, error: SourceError },
}

/// Whether a tick reached the point where the source counts as healthy again
enum Step {
    Unchanged,
    Completed,
}

pub struct Poller<D: DataSource + ?Sized> {
    config: PollerConfig,
    source: Arc<D>,
    registry: BlockRegistry,
    feed: FeedBuffer,
    last_known: Option<u64>,
    backoff: Backoff,
    degraded: bool,
    last_error: Option<String>,
    blocks_processed: u64,
    snapshot_tx: watch::Sender<Arc<FeedSnapshot>>,
    cancellation_token: CancellationToken,
}

impl<D: DataSource + ?Sized> Poller<D> {
    /// Create a poller and the handle readers use to watch its feed
    pub fn new(
        config: PollerConfig,
        source: Arc<D>,
        cancellation_token: CancellationToken,
    ) -> (Self, FeedHandle) {
        let backoff = config.backoff();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(FeedSnapshot::empty(backoff.current())));
        let poller = Self {
            registry: BlockRegistry::new(config.fresh_ttl()),
            feed: FeedBuffer::with_capacity(config.feed_capacity),
            config,
            source,
            last_known: None,
            backoff,
            degraded: false,
            last_error: None,
            blocks_processed: 0,
            snapshot_tx,
            cancellation_token,
        };
        (poller, FeedHandle::new(snapshot_rx))
    }

    pub fn phase(&self) -> Phase {
        match self.last_known {
            None => Phase::Bootstrap,
            Some(_) => Phase::Steady,
        }
    }

    /// Last block applied to the feed
    pub fn last_known_block(&self) -> Option<u64> {
        self.last_known
    }

    pub fn is_healthy(&self) -> bool {
        !self.degraded
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn feed(&self) -> &FeedBuffer {
        &self.feed
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Run one polling cycle and publish a fresh snapshot.
    pub async fn tick(&mut self) -> TickOutcome {
        let mut applied = Vec::new();
        let result = match self.last_known {
            None => self.bootstrap(&mut applied).await,
            Some(last_known) => self.reconcile(last_known, &mut applied).await,
        };

        let outcome = match result {
            Ok(step) => {
                if let Step::Completed = step {
                    self.recover();
                }
                if applied.is_empty() {
                    TickOutcome::Idle
                } else {
                    TickOutcome::Applied(applied)
                }
            }
            Err(error) => {
                self.degrade(&error);
                TickOutcome::Failed { applied, error }
            }
        };

        self.publish();
        outcome
    }

    async fn bootstrap(&mut self, applied: &mut Vec<u64>) -> Result<Step, SourceError> {
        let block = self.source.fetch_latest_block().await?;

        let Some(number) = block.number else {
            debug!("Latest block is not numbered yet, waiting");
            return Ok(Step::Unchanged);
        };
        if self.registry.is_processed(number) {
            return Ok(Step::Unchanged);
        }

        self.apply_block(number, &block);
        applied.push(number);
        info!(block_number = number, "Bootstrapped from latest block");
        Ok(Step::Completed)
    }

    async fn reconcile(&mut self, last_known: u64, applied: &mut Vec<u64>) -> Result<Step, SourceError> {
        let latest = self.source.fetch_latest_block().await?;
        let upper = match latest.number {
            Some(number) if number > last_known => number,
            _ => return Ok(Step::Unchanged),
        };

        debug!(from_block = last_known + 1, to_block = upper, "Walking forward to tip");

        let mut next = last_known + 1;
        let mut fetched = 0;
        while next <= upper && fetched < self.config.max_blocks_per_tick {
            if self.cancellation_token.is_cancelled() {
                info!("Stop requested, ending walk early");
                break;
            }
            if self.registry.is_processed(next) {
                self.advance_to(next);
                next += 1;
                continue;
            }

            fetched += 1;
            let block = match self.source.fetch_block_by_number(next).await {
                Ok(block) => block,
                Err(error) if error.is_not_yet() => {
                    debug!(block_number = next, "Block not available yet, retrying next tick");
                    break;
                }
                Err(error) => return Err(error),
            };

            match block.number {
                Some(number) if self.registry.is_processed(number) => {
                    debug!(block_number = number, "Block already applied, skipping");
                }
                Some(number) => {
                    self.apply_block(number, &block);
                    applied.push(number);
                }
                None => {
                    debug!(block_number = next, "Block came back unnumbered, retrying next tick");
                    break;
                }
            }
            next += 1;
        }

        let reached = self.last_known.unwrap_or(last_known);
        if reached < upper {
            debug!(behind = upper - reached, "Still behind tip, continuing next tick");
        }
        Ok(Step::Completed)
    }

    /// Commit a block: dedup, classify, mark fresh, prepend to the feed.
    ///
    /// The whole batch lands in one `insert_batch` so a block is never
    /// partially visible.
    fn apply_block(&mut self, number: u64, block: &Block) {
        if !self.registry.mark_processed(number) {
            return;
        }

        let batch: Vec<ClassifiedTransaction> = block
            .transactions
            .iter()
            .map(|tx| ClassifiedTransaction::from_raw(tx, number, block.timestamp))
            .collect();
        for tx in &batch {
            self.registry.mark_fresh(tx.hash);
        }

        let count = batch.len();
        self.feed.insert_batch(batch);
        self.advance_to(number);
        self.blocks_processed += 1;
        info!(block_number = number, transactions = count, "Applied block");
    }

    fn advance_to(&mut self, number: u64) {
        self.last_known = Some(self.last_known.map_or(number, |last| last.max(number)));
    }

    fn recover(&mut self) {
        if self.degraded {
            info!(
                failures = self.backoff.consecutive_failures(),
                "Source recovered, restoring base polling interval"
            );
        }
        self.degraded = false;
        self.last_error = None;
        self.backoff.reset();
    }

    fn degrade(&mut self, error: &SourceError) {
        self.degraded = true;
        self.last_error = Some(error.to_string());
        let delay = self.backoff.on_failure();
        warn!(
            error = %error,
            failures = self.backoff.consecutive_failures(),
            retry_in_ms = delay.as_millis() as u64,
            "Failed to fetch blockchain data, backing off"
        );
    }

    fn status(&self) -> FeedStatus {
        FeedStatus {
            current_block: self.last_known,
            healthy: !self.degraded,
            blocks_processed: self.blocks_processed,
            last_error: self.last_error.clone(),
            next_poll_in: self.backoff.current(),
        }
    }

    fn publish(&mut self) {
        let fresh = self.registry.fresh_mut().deadlines();
        let snapshot = FeedSnapshot::new(self.feed.snapshot(), self.status(), fresh);
        self.snapshot_tx.send_replace(Arc::new(snapshot));
    }

    /// Poll until the cancellation token fires.
    ///
    /// The first tick waits one base interval. After that the delay is
    /// whatever the backoff says once the previous tick has finished.
    pub async fn run(mut self) {
        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_blocks_per_tick = self.config.max_blocks_per_tick,
            "Poller started"
        );
        let mut delay = self.backoff.base();

        loop {
            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    info!("Poller stop signal received, shutting down...");
                    break;
                }

                _ = sleep(delay) => {
                    self.tick().await;
                    delay = self.backoff.current();
                }
            }
        }
        info!("Poller has shut down.");
    }
}

impl<D: DataSource + ?Sized + 'static> Poller<D> {
    /// Move the poller onto its own task
    pub fn spawn(self) -> PollerHandle {
        let cancellation_token = self.cancellation_token.clone();
        let join = tokio::spawn(self.run());
        PollerHandle { cancellation_token, join }
    }
}

/// Owner's handle on a spawned poller
pub struct PollerHandle {
    cancellation_token: CancellationToken,
    join: JoinHandle<()>,
}

impl PollerHandle {
    /// Raise the stop signal and wait for the task to wind down.
    ///
    /// A tick already in progress finishes its current block first.
    pub async fn stop(self) -> Result<(), JoinError> {
        self.cancellation_token.cancel();
        self.join.await
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
