//! JSON-RPC Data Source
//!
//! `DataSource` backed by an Ethereum node over HTTP, WebSocket or a Unix IPC
//! socket. Blocks are requested with `eth_getBlockByNumber(tag, true)` and
//! decoded into the poller's own model, keeping the block number nullable the
//! way the node reports it for pending tips.

use std::path::Path;

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, Bytes, TxHash, U256, U64};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::transports::{BoxTransport, RpcError, TransportError};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::backoff::Backoff;
use crate::source::{Block, DataSource, RawTransaction, SourceError};

const GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";

/// Errors that can occur while connecting to the node
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("IPC socket not found at path: {0}")]
    SocketNotFound(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Max connection attempts ({0}) exceeded")]
    AttemptsExhausted(u32),
}

/// Expand ~ to home directory in path
pub fn expand_path(path: &str) -> String {
    if path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

/// Anything that isn't an http(s) or ws(s) URL is treated as an IPC path
pub fn is_ipc_endpoint(endpoint: &str) -> bool {
    let lower = endpoint.to_ascii_lowercase();
    !["http://", "https://", "ws://", "wss://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

/// `host:port` with no scheme, e.g. `localhost:8545` or `10.0.0.2:8545/rpc`
fn looks_like_host_port(endpoint: &str) -> bool {
    let authority = endpoint.split('/').next().unwrap_or(endpoint);
    match authority.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !port.is_empty() && port.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Check if an IPC socket exists at the given path
pub fn socket_exists(path: &str) -> bool {
    Path::new(&expand_path(path)).exists()
}

/// Validate that an endpoint is usable
pub fn validate_endpoint(endpoint: &str) -> Result<(), ConnectError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(ConnectError::InvalidEndpoint("Endpoint cannot be empty".to_string()));
    }

    if is_ipc_endpoint(endpoint) {
        let expanded = expand_path(endpoint);
        if expanded.contains("://") {
            return Err(ConnectError::InvalidEndpoint(format!("Unsupported scheme: {}", endpoint)));
        }
        if looks_like_host_port(&expanded) {
            return Err(ConnectError::InvalidEndpoint(format!(
                "Missing scheme in {}, expected http://, https://, ws:// or wss://",
                endpoint
            )));
        }
        if !expanded.ends_with(".ipc") {
            warn!("IPC path '{}' may not be a valid socket path", endpoint);
        }
    }

    Ok(())
}

/// Block as returned by `eth_getBlockByNumber` with full transactions
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlock {
    number: Option<U64>,
    timestamp: U64,
    #[serde(default)]
    transactions: Vec<RpcTransaction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    hash: TxHash,
    from: Address,
    #[serde(default)]
    to: Option<Address>,
    #[serde(default)]
    value: U256,
    #[serde(default)]
    input: Bytes,
    #[serde(default)]
    block_number: Option<U64>,
}

impl From<RpcTransaction> for RawTransaction {
    fn from(tx: RpcTransaction) -> Self {
        Self {
            hash: tx.hash,
            from: tx.from,
            to: tx.to,
            value: tx.value,
            input: tx.input,
            block_number: tx.block_number.map(|n| n.to::<u64>()),
        }
    }
}

impl From<RpcBlock> for Block {
    fn from(block: RpcBlock) -> Self {
        Self {
            number: block.number.map(|n| n.to::<u64>()),
            timestamp: block.timestamp.to::<u64>(),
            transactions: block.transactions.into_iter().map(RawTransaction::from).collect(),
        }
    }
}

/// A response body we couldn't decode is the node's fault, not the network's
fn source_error(err: TransportError) -> SourceError {
    match err {
        RpcError::DeserError { err, .. } => SourceError::Malformed(err.to_string()),
        other => SourceError::Unavailable(other.to_string()),
    }
}

/// JSON-RPC backed block source
#[derive(Debug)]
pub struct RpcSource {
    provider: RootProvider<BoxTransport>,
    endpoint: String,
}

impl RpcSource {
    /// Connect to an endpoint
    ///
    /// HTTP endpoints connect lazily, so this only fails for them on a bad
    /// URL. WebSocket and IPC endpoints open the connection here.
    pub async fn connect(endpoint: &str) -> Result<Self, ConnectError> {
        validate_endpoint(endpoint)?;

        let endpoint = if is_ipc_endpoint(endpoint) {
            let expanded = expand_path(endpoint.trim());
            if !Path::new(&expanded).exists() {
                return Err(ConnectError::SocketNotFound(expanded));
            }
            expanded
        } else {
            endpoint.trim().to_string()
        };

        info!("Connecting to chain node at {}", endpoint);
        let provider: RootProvider<BoxTransport> = ProviderBuilder::new()
            .on_builtin(&endpoint)
            .await
            .map_err(|e| ConnectError::ConnectionFailed(e.to_string()))?;

        Ok(Self { provider, endpoint })
    }

    /// Connect, retrying with exponential backoff
    ///
    /// Invalid endpoints fail immediately; everything else is retried up to
    /// `max_attempts` times.
    pub async fn connect_with_retry(
        endpoint: &str,
        max_attempts: u32,
        mut backoff: Backoff,
    ) -> Result<Self, ConnectError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match Self::connect(endpoint).await {
                Ok(source) => {
                    info!("Successfully connected to chain node");
                    return Ok(source);
                }
                Err(e @ ConnectError::InvalidEndpoint(_)) => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    error!("Connection attempt {} failed: {}", attempt, e);
                    return Err(ConnectError::AttemptsExhausted(max_attempts));
                }
                Err(e) => {
                    let delay = backoff.current();
                    warn!(
                        "Connection attempt {}/{} failed: {}, retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    sleep(delay).await;
                    backoff.on_failure();
                }
            }
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_block(&self, tag: BlockNumberOrTag) -> Result<Option<Block>, SourceError> {
        let block: Option<RpcBlock> = self
            .provider
            .raw_request(GET_BLOCK_BY_NUMBER.into(), (tag, true))
            .await
            .map_err(source_error)?;
        Ok(block.map(Block::from))
    }
}

#[async_trait]
impl DataSource for RpcSource {
    async fn fetch_latest_block(&self) -> Result<Block, SourceError> {
        self.get_block(BlockNumberOrTag::Latest)
            .await?
            .ok_or_else(|| SourceError::Malformed("node returned no latest block".to_string()))
    }

    async fn fetch_block_by_number(&self, number: u64) -> Result<Block, SourceError> {
        self.get_block(BlockNumberOrTag::Number(number))
            .await?
            .ok_or(SourceError::NotFound(number))
    }
}
