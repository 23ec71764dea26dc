//! Retry Backoff
//!
//! Doubling delay between polls while the source is failing, capped, and
//! snapped back to the base interval on the first success.

use std::time::Duration;

/// Base delay between polls in milliseconds
pub const INITIAL_BACKOFF_MS: u64 = 2000;

/// Maximum backoff delay in milliseconds
pub const MAX_BACKOFF_MS: u64 = 10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    current_ms: u64,
    consecutive_failures: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_BACKOFF_MS, MAX_BACKOFF_MS)
    }
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms: max_ms.max(base_ms),
            current_ms: base_ms,
            consecutive_failures: 0,
        }
    }

    /// Delay to wait before the next attempt
    pub fn current(&self) -> Duration {
        Duration::from_millis(self.current_ms)
    }

    pub fn base(&self) -> Duration {
        Duration::from_millis(self.base_ms)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Record a failure and return the new delay
    pub fn on_failure(&mut self) -> Duration {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.current_ms = self.current_ms.saturating_mul(2).min(self.max_ms);
        self.current()
    }

    /// Record a success; the delay returns to the base interval
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.current_ms = self.base_ms;
    }
}
