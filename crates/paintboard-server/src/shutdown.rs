//! Graceful shutdown.
//!
//! Order on stop: stop accepting paints, close every connection, wait a
//! bounded time for connection tasks to finish, then (after the HTTP server
//! returns) save the whole board once more.

use crate::autosave::{self, SaveMode};
use crate::hub::BroadcastHub;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How long to wait for connections to close.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait for Ctrl+C, SIGTERM or `stop`.
pub async fn wait_for_signal(stop: &CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
        _ = stop.cancelled() => {}
    }
}

/// Graceful-shutdown future for the HTTP server: resolves once peers are
/// gone or [`DRAIN_TIMEOUT`] passed.
pub async fn before_stop(hub: Arc<BroadcastHub>, stop: CancellationToken) {
    wait_for_signal(&stop).await;
    stop.cancel();
    drain(&hub, DRAIN_TIMEOUT).await;
}

/// Stop accepting paints and disconnect all peers.
pub async fn drain(hub: &BroadcastHub, timeout: Duration) {
    info!("Server stopping...");
    hub.stop_accepting();
    hub.disconnect_all();
    if !hub.wait_for_peers(timeout).await {
        warn!(remaining = hub.peer_count(), "Peers still connected after drain timeout");
    }
}

/// Final save once nothing can paint any more.
pub async fn after_stop(hub: &BroadcastHub) {
    match autosave::save(hub.service(), SaveMode::All).await {
        Some(report) if report.is_ok() => {}
        Some(report) => error!(failed = report.failures.len(), "Final save incomplete"),
        None => error!("Final save did not run"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paintboard_core::{BlockStore, BoardConfig, CanvasService, MemoryStore};

    #[tokio::test]
    async fn test_drain_then_final_save() {
        let store = Arc::new(MemoryStore::new());
        let config = BoardConfig {
            width: 2,
            height: 2,
            block_size: 2,
            colors: vec!["#fff".to_string(), "#000".to_string()],
            background: 0,
        };
        let service = Arc::new(CanvasService::open(config, store.clone()).unwrap());
        let hub = BroadcastHub::new(service);

        hub.service().set_pixel(1, 1, 1);
        drain(&hub, Duration::from_millis(10)).await;
        assert!(!hub.is_accepting());

        after_stop(&hub).await;
        assert_eq!(
            store.read_block(paintboard_core::BlockId::new(0, 0)).unwrap(),
            vec![0, 0, 0, 1]
        );
    }

    #[tokio::test]
    async fn test_stop_token_ends_wait() {
        let stop = CancellationToken::new();
        stop.cancel();
        wait_for_signal(&stop).await;
    }
}
