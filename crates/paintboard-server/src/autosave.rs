//! Periodic and on-demand board saves.
//!
//! Saving touches the disk, so every save runs on the blocking pool.

use paintboard_core::{CanvasService, SaveReport};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Which regions a save covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Dirty blocks only
    Dirty,
    /// Every block, dirty or not
    Forced,
    /// Manifest and every block
    All,
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dirty => "dirty",
            Self::Forced => "forced",
            Self::All => "all",
        })
    }
}

/// Run one save and log its outcome. `None` if the save task itself died.
pub async fn save(service: &Arc<CanvasService>, mode: SaveMode) -> Option<SaveReport> {
    let started = Instant::now();
    let board = service.clone();
    let result = tokio::task::spawn_blocking(move || match mode {
        SaveMode::Dirty => board.save_blocks(false),
        SaveMode::Forced => board.save_blocks(true),
        SaveMode::All => board.save_all(),
    })
    .await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            error!(%mode, error = %e, "Save task failed");
            return None;
        }
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    for failure in &report.failures {
        warn!(%mode, region = %failure.region, error = %failure.error, "Failed to save region");
    }
    if report.written == 0 && report.failures.is_empty() {
        debug!(%mode, elapsed_ms, "Nothing to save");
    } else {
        info!(
            %mode,
            written = report.written,
            skipped = report.skipped,
            failed = report.failures.len(),
            elapsed_ms,
            "Board saved"
        );
    }
    Some(report)
}

/// Save dirty blocks every `interval` until `shutdown` fires.
pub async fn run(service: Arc<CanvasService>, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_secs = interval.as_secs(), "Auto-save started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                save(&service, SaveMode::Dirty).await;
            }
        }
    }
    debug!("Auto-save stopped");
}
