//! In-process cache backed by DashMap for lock-free concurrent access.
//! Used when no Redis is configured and as the cache store in tests.

use crate::error::CacheError;
use crate::store::CacheStore;
use async_trait::async_trait;
use banner_core::CacheKey;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Expiry used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Lock-free local cache with a per-entry expiry.
pub struct LocalCache {
    store: DashMap<CacheKey, CacheEntry>,
    max_entries: usize,
}

impl LocalCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: DashMap::new(),
            max_entries,
        }
    }

    /// Remove expired entries. Call this periodically from a background task.
    pub fn evict_expired(&self) -> usize {
        let before = self.store.len();
        let now = Instant::now();
        self.store.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.store.len())
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl CacheStore for LocalCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let Some(entry) = self.store.get(key) else {
            return Ok(None);
        };
        if entry.is_expired(Instant::now()) {
            drop(entry);
            self.store
                .remove_if(key, |_, entry| entry.is_expired(Instant::now()));
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), CacheError> {
        if self.store.len() >= self.max_entries && !self.store.contains_key(key) {
            // Expired entries still count against capacity until swept.
            if self.evict_expired() == 0 {
                return Err(CacheError::CapacityExceeded(self.max_entries));
            }
        }
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .ok_or(CacheError::TtlOutOfRange(ttl))?;
        self.store.insert(
            *key,
            CacheEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = LocalCache::new(16);
        let key = CacheKey::new(1, 2);
        cache.set(&key, "v1", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("v1"));

        cache.set(&key, "v2", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("v2"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_unbounded_ttl_is_saturated() {
        let cache = LocalCache::new(16);
        let key = CacheKey::new(1, 2);
        cache
            .set(&key, "forever", Duration::from_secs(u64::MAX))
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("forever"));
        assert_eq!(cache.evict_expired(), 0);
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let cache = LocalCache::new(16);
        let key = CacheKey::new(1, 2);
        cache.set(&key, "v", Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get(&key).await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_capacity_reclaims_expired_entries() {
        let cache = LocalCache::new(1);
        cache
            .set(&CacheKey::new(1, 1), "a", Duration::from_millis(30))
            .await
            .unwrap();

        let err = cache
            .set(&CacheKey::new(1, 2), "b", Duration::from_secs(60))
            .await;
        assert!(matches!(err, Err(CacheError::CapacityExceeded(1))));

        tokio::time::sleep(Duration::from_millis(80)).await;
        cache
            .set(&CacheKey::new(1, 2), "b", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_evict_expired() {
        let cache = LocalCache::new(16);
        cache
            .set(&CacheKey::new(1, 1), "a", Duration::from_millis(10))
            .await
            .unwrap();
        cache
            .set(&CacheKey::new(1, 2), "b", Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.evict_expired(), 1);
        assert_eq!(cache.len(), 1);
    }
}
