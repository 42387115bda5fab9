//! Periodic driver for [`CacheWarmer`].
//!
//! The first pass runs as soon as the scheduler starts, then one pass per
//! interval until the shutdown signal flips to `true`:
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let handle = RefreshScheduler::new(warmer, Duration::from_secs(300)).spawn(shutdown_rx);
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! let stats = handle.await?;
//! ```

use crate::warmer::CacheWarmer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// `tokio::time::interval` rejects a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Totals reported when the scheduler stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub passes: u64,
    pub failed_passes: u64,
}

pub struct RefreshScheduler {
    warmer: Arc<CacheWarmer>,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(warmer: Arc<CacheWarmer>, interval: Duration) -> Self {
        Self {
            warmer,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn spawn(self, shutdown_rx: watch::Receiver<bool>) -> JoinHandle<RefreshStats> {
        tokio::spawn(self.run(shutdown_rx))
    }

    /// Run until shutdown is signalled or the sender is dropped.
    ///
    /// Passes run inline on this task, so a tick can never start a second
    /// pass while one is in flight. Ticks missed during a slow pass are
    /// dropped rather than replayed. Shutdown is only observed between
    /// passes.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> RefreshStats {
        let mut stats = RefreshStats::default();

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = self.interval.as_secs(),
            ttl_secs = self.warmer.ttl().as_secs(),
            "Cache refresh scheduler started"
        );

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }

                _ = ticker.tick() => {
                    stats.passes += 1;
                    if let Err(e) = self.warmer.refresh().await {
                        stats.failed_passes += 1;
                        debug!(error = %e, pass = stats.passes, "Cache refresh pass abandoned");
                    }
                }
            }
        }

        info!(
            passes = stats.passes,
            failed_passes = stats.failed_passes,
            "Cache refresh scheduler stopped"
        );

        stats
    }
}
