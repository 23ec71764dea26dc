//! Poller Configuration
//!
//! Defaults come from the constants below. A JSON file may override any
//! subset of fields, and `BLOCKFEED_*` environment variables override both.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::backoff::{Backoff, INITIAL_BACKOFF_MS, MAX_BACKOFF_MS};
use crate::feed::DEFAULT_FEED_CAPACITY;
use crate::registry::DEFAULT_FRESH_TTL_MS;

/// Public Base mainnet endpoint
pub const DEFAULT_RPC_URL: &str = "https://mainnet.base.org";

/// Maximum number of blocks fetched in one gap-fill tick
pub const MAX_BLOCKS_PER_TICK: u64 = 5;

/// Attempts at the initial connection before giving up
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 10;

/// Env var naming a JSON config file
pub const CONFIG_PATH_ENV: &str = "BLOCKFEED_CONFIG";

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the reconciling poller
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// HTTP(S), WS(S) URL or IPC socket path of the chain node
    pub rpc_url: String,
    /// Base delay between ticks in milliseconds
    pub poll_interval_ms: u64,
    /// Ceiling for the failure backoff in milliseconds
    pub max_backoff_ms: u64,
    /// Gap-fill cap per tick
    pub max_blocks_per_tick: u64,
    /// Number of transactions kept in the feed
    pub feed_capacity: usize,
    /// Fresh-arrival marking window in milliseconds
    pub fresh_ttl_ms: u64,
    /// Initial connection attempts
    pub connect_attempts: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            poll_interval_ms: INITIAL_BACKOFF_MS,
            max_backoff_ms: MAX_BACKOFF_MS,
            max_blocks_per_tick: MAX_BLOCKS_PER_TICK,
            feed_capacity: DEFAULT_FEED_CAPACITY,
            fresh_ttl_ms: DEFAULT_FRESH_TTL_MS,
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
        }
    }
}

impl PollerConfig {
    /// Create a new config with the specified endpoint
    pub fn with_rpc_url(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            ..Default::default()
        }
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Defaults, then the file named by `BLOCKFEED_CONFIG` if set, then
    /// individual `BLOCKFEED_*` overrides. The result is validated.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        let config = base.with_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (normally the process env)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(url) = lookup("BLOCKFEED_RPC_URL") {
            self.rpc_url = url;
        }
        if let Some(v) = parse_env(&lookup, "BLOCKFEED_POLL_INTERVAL_MS")? {
            self.poll_interval_ms = v;
        }
        if let Some(v) = parse_env(&lookup, "BLOCKFEED_MAX_BACKOFF_MS")? {
            self.max_backoff_ms = v;
        }
        if let Some(v) = parse_env(&lookup, "BLOCKFEED_MAX_BLOCKS_PER_TICK")? {
            self.max_blocks_per_tick = v;
        }
        if let Some(v) = parse_env(&lookup, "BLOCKFEED_FEED_CAPACITY")? {
            self.feed_capacity = v;
        }
        if let Some(v) = parse_env(&lookup, "BLOCKFEED_FRESH_TTL_MS")? {
            self.fresh_ttl_ms = v;
        }
        if let Some(v) = parse_env(&lookup, "BLOCKFEED_CONNECT_ATTEMPTS")? {
            self.connect_attempts = v;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_url.trim().is_empty() {
            return Err(ConfigError::Invalid("rpc_url cannot be empty".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive".to_string()));
        }
        if self.max_backoff_ms < self.poll_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "max_backoff_ms ({}) is below poll_interval_ms ({})",
                self.max_backoff_ms, self.poll_interval_ms
            )));
        }
        if self.max_blocks_per_tick == 0 {
            return Err(ConfigError::Invalid("max_blocks_per_tick must be positive".to_string()));
        }
        if self.feed_capacity == 0 {
            return Err(ConfigError::Invalid("feed_capacity must be positive".to_string()));
        }
        if self.connect_attempts == 0 {
            return Err(ConfigError::Invalid("connect_attempts must be positive".to_string()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fresh_ttl(&self) -> Duration {
        Duration::from_millis(self.fresh_ttl_ms)
    }

    /// Fresh backoff state for these bounds
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.poll_interval_ms, self.max_backoff_ms)
    }
}

fn parse_env<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
    }
}
