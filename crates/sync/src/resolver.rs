//! Banner lookup by `(feature, tag)`.

use crate::bounded::{cache_call, store_call};
use banner_cache::CacheStore;
use banner_core::{Banner, BannerFilter, BannerResult, CacheKey};
use banner_store::BannerRepository;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Chooses between the cache and the record store for a lookup.
pub struct BannerResolver {
    records: Arc<dyn BannerRepository>,
    cache: Arc<dyn CacheStore>,
    op_timeout: Duration,
}

impl BannerResolver {
    pub fn new(
        records: Arc<dyn BannerRepository>,
        cache: Arc<dyn CacheStore>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            records,
            cache,
            op_timeout,
        }
    }

    /// Find the banner for `(feature_id, tag_id)`.
    ///
    /// With `prefer_cache` the cached copy from the last refresh pass is
    /// returned when present, even if the record has changed since. A miss,
    /// an unreadable entry or a cache failure falls through to the record
    /// store. Non-admin callers never get a banner that is inactive in the
    /// copy being returned. Only `NotFound` and store failures reach the
    /// caller.
    pub async fn resolve(
        &self,
        feature_id: i64,
        tag_id: i64,
        requester_is_admin: bool,
        prefer_cache: bool,
    ) -> BannerResult<Banner> {
        if prefer_cache {
            if let Some(banner) = self.from_cache(feature_id, tag_id, requester_is_admin).await {
                return Ok(banner);
            }
        }

        let filter = BannerFilter::lookup(feature_id, tag_id, !requester_is_admin);
        let banner = store_call(self.op_timeout, self.records.find_one(&filter)).await?;
        metrics::counter!("lookup.store.hit").increment(1);
        Ok(banner)
    }

    async fn from_cache(&self, feature_id: i64, tag_id: i64, requester_is_admin: bool) -> Option<Banner> {
        let key = CacheKey::new(feature_id, tag_id);

        let raw = match cache_call(self.op_timeout, self.cache.get(&key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                metrics::counter!("lookup.cache.miss").increment(1);
                debug!(key = %key, "Cache miss, falling back to record store");
                return None;
            }
            Err(e) => {
                metrics::counter!("lookup.cache.error").increment(1);
                warn!(key = %key, error = %e, "Cache read failed, falling back to record store");
                return None;
            }
        };

        let banner: Banner = match serde_json::from_str(&raw) {
            Ok(banner) => banner,
            Err(e) => {
                metrics::counter!("lookup.cache.error").increment(1);
                warn!(key = %key, error = %e, "Unreadable cache entry, falling back to record store");
                return None;
            }
        };

        if !banner.is_active && !requester_is_admin {
            debug!(key = %key, banner_id = banner.id, "Cached banner inactive, checking record store");
            return None;
        }

        metrics::counter!("lookup.cache.hit").increment(1);
        Some(banner)
    }
}
