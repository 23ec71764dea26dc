use std::sync::Arc;

use blockfeed::display::{current_timestamp_millis, feed_summary, format_entry};
use blockfeed::{FeedHandle, Poller, PollerConfig, RpcSource};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_LOG_FILTER: &str = "blockfeed=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::debug!("Loading poller configuration...");
    let config = PollerConfig::load()?;
    tracing::debug!(
        rpc_url = %config.rpc_url,
        poll_interval_ms = config.poll_interval_ms,
        feed_capacity = config.feed_capacity,
        "Configuration loaded."
    );

    let source = RpcSource::connect_with_retry(&config.rpc_url, config.connect_attempts, config.backoff()).await?;
    tracing::info!(endpoint = source.endpoint(), "Chain data source initialized.");

    let (poller, feed) = Poller::new(config, Arc::new(source), CancellationToken::new());
    let handle = poller.spawn();

    watch_feed(feed).await;

    tracing::info!("Shutdown requested, stopping poller...");
    handle.stop().await?;

    Ok(())
}

/// Log every new arrival until Ctrl-C or the poller goes away
async fn watch_feed(mut feed: FeedHandle) {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut last_logged_block = 0u64;
    let mut was_healthy = true;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,

            changed = feed.changed() => {
                if !changed {
                    tracing::warn!("Poller stopped publishing");
                    break;
                }

                let snapshot = feed.snapshot();
                let status = snapshot.status();

                if status.healthy != was_healthy {
                    if status.healthy {
                        tracing::info!("Feed healthy again");
                    } else {
                        tracing::warn!(
                            error = status.last_error.as_deref().unwrap_or("unknown"),
                            retry_in = ?status.next_poll_in,
                            "Feed degraded, showing last known entries"
                        );
                    }
                    was_healthy = status.healthy;
                }

                let now = current_timestamp_millis();
                let fresh: Vec<_> = snapshot
                    .entries()
                    .iter()
                    .filter(|tx| tx.block_number > last_logged_block)
                    .collect();
                if fresh.is_empty() {
                    continue;
                }

                // Entries are newest first; print oldest first
                for tx in fresh.iter().rev() {
                    println!("{}", format_entry(tx, now));
                }
                last_logged_block = fresh.iter().map(|tx| tx.block_number).max().unwrap_or(last_logged_block);

                tracing::info!(
                    current_block = ?status.current_block,
                    blocks_processed = status.blocks_processed,
                    "{}",
                    feed_summary(snapshot.len(), snapshot.unique_block_count())
                );
            }
        }
    }
}
