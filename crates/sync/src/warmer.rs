//! Denormalization of banners into per-`(feature, tag)` cache entries.

use crate::bounded::{cache_call, store_call};
use banner_cache::CacheStore;
use banner_core::{BannerResult, CacheKey};
use banner_store::BannerRepository;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Outcome of one refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub banners: usize,
    pub entries_written: usize,
    pub failed_writes: usize,
    /// Keys written more than once in this pass. The last banner wins.
    pub key_collisions: usize,
}

/// Writes the full banner table into the cache store.
pub struct CacheWarmer {
    records: Arc<dyn BannerRepository>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
    op_timeout: Duration,
    pass: Mutex<()>,
}

impl CacheWarmer {
    pub fn new(
        records: Arc<dyn BannerRepository>,
        cache: Arc<dyn CacheStore>,
        ttl: Duration,
        op_timeout: Duration,
    ) -> Self {
        Self {
            records,
            cache,
            ttl,
            op_timeout,
            pass: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Run one refresh pass.
    ///
    /// Passes never overlap: a caller arriving while another pass is running
    /// waits for it and then runs its own. If the banner table cannot be read
    /// the pass is abandoned and the existing entries are left to expire.
    /// A failed write for one key is logged and the pass continues. Entries
    /// are written key by key, so concurrent readers may see a mix of the
    /// previous and the current pass.
    pub async fn refresh(&self) -> BannerResult<RefreshReport> {
        let _pass = self.pass.lock().await;
        let start = Instant::now();

        let banners = match store_call(self.op_timeout, self.records.find_all()).await {
            Ok(banners) => banners,
            Err(e) => {
                error!(error = %e, "Failed to load banners, keeping previous cache entries");
                metrics::counter!("refresh.aborted").increment(1);
                return Err(e);
            }
        };

        let mut report = RefreshReport {
            banners: banners.len(),
            ..Default::default()
        };
        let mut written: HashSet<CacheKey> = HashSet::new();

        for banner in &banners {
            let value = match serde_json::to_string(banner) {
                Ok(json) => json,
                Err(e) => {
                    warn!(banner_id = banner.id, error = %e, "Failed to serialize banner");
                    report.failed_writes += banner.tag_ids.len();
                    continue;
                }
            };

            for key in banner.cache_keys() {
                if !written.insert(key) {
                    report.key_collisions += 1;
                    debug!(key = %key, banner_id = banner.id, "Cache key already written in this pass");
                }

                match cache_call(self.op_timeout, self.cache.set(&key, &value, self.ttl)).await {
                    Ok(()) => report.entries_written += 1,
                    Err(e) => {
                        report.failed_writes += 1;
                        warn!(key = %key, banner_id = banner.id, error = %e, "Failed to write cache entry");
                    }
                }
            }
        }

        metrics::counter!("refresh.passes").increment(1);
        metrics::counter!("refresh.entries_written").increment(report.entries_written as u64);
        if report.failed_writes > 0 {
            metrics::counter!("refresh.failed_writes").increment(report.failed_writes as u64);
        }

        info!(
            banners = report.banners,
            entries = report.entries_written,
            failed = report.failed_writes,
            collisions = report.key_collisions,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Cache refresh pass complete"
        );

        Ok(report)
    }
}
