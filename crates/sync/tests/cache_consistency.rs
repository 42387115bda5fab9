//! End-to-end behaviour of the refresh pass and lookups sharing one cache.
//! Runs entirely against the in-memory store and local cache.

use banner_cache::{CacheStore, LocalCache};
use banner_core::{Banner, BannerPayload, CacheKey};
use banner_store::{BannerRepository, InMemoryStore};
use banner_sync::{BannerResolver, CacheWarmer};
use std::sync::Arc;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(300);
const OP_TIMEOUT: Duration = Duration::from_secs(1);

struct Harness {
    store: Arc<InMemoryStore>,
    cache: Arc<LocalCache>,
    warmer: Arc<CacheWarmer>,
    resolver: BannerResolver,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let cache = Arc::new(LocalCache::new(1024));
    let warmer = Arc::new(CacheWarmer::new(store.clone(), cache.clone(), TTL, OP_TIMEOUT));
    let resolver = BannerResolver::new(store.clone(), cache.clone(), OP_TIMEOUT);
    Harness {
        store,
        cache,
        warmer,
        resolver,
    }
}

fn promo(feature_id: i64, tag_ids: Vec<i64>, is_active: bool) -> BannerPayload {
    BannerPayload {
        feature_id,
        tag_ids,
        title: "Spring sale".to_string(),
        text: "Everything half off".to_string(),
        url: "https://example.com/sale".to_string(),
        is_active,
    }
}

async fn cached(cache: &LocalCache, feature_id: i64, tag_id: i64) -> Option<Banner> {
    cache
        .get(&CacheKey::new(feature_id, tag_id))
        .await
        .unwrap()
        .map(|raw| serde_json::from_str(&raw).unwrap())
}

#[tokio::test]
async fn test_every_tag_is_readable_after_refresh() {
    let h = harness();
    let mut banners = Vec::new();
    for feature in 1..=4 {
        let tags: Vec<i64> = (1..=feature).map(|t| t * 10 + feature).collect();
        banners.push(h.store.create(promo(feature, tags, feature % 2 == 0)).await.unwrap());
    }

    h.warmer.refresh().await.unwrap();

    for banner in &banners {
        for &tag in &banner.tag_ids {
            assert_eq!(cached(&h.cache, banner.feature_id, tag).await.as_ref(), Some(banner));
        }
    }
}

#[tokio::test]
async fn test_store_only_banner_then_cache_hit() {
    let h = harness();
    let banner = h.store.create(promo(10, vec![5, 7], true)).await.unwrap();

    // Nothing cached yet: falls back to the record store.
    assert!(cached(&h.cache, 10, 5).await.is_none());
    let from_store = h.resolver.resolve(10, 5, false, true).await.unwrap();
    assert_eq!(from_store, banner);

    h.warmer.refresh().await.unwrap();

    let from_cache = h.resolver.resolve(10, 5, false, true).await.unwrap();
    assert_eq!(from_cache, banner);
    assert_eq!(
        serde_json::to_vec(&from_cache).unwrap(),
        serde_json::to_vec(&from_store).unwrap()
    );
}

#[tokio::test]
async fn test_deactivated_banner_stays_cached_until_next_pass() {
    let h = harness();
    let banner = h.store.create(promo(10, vec![5, 7], true)).await.unwrap();
    h.warmer.refresh().await.unwrap();

    h.store
        .update(banner.id, promo(10, vec![5, 7], false))
        .await
        .unwrap();

    let stale = h.resolver.resolve(10, 5, false, true).await.unwrap();
    assert!(stale.is_active);
    assert_eq!(stale.updated_at, banner.updated_at);

    let fresh = h.resolver.resolve(10, 5, false, false).await.unwrap_err();
    assert!(fresh.is_not_found());

    // The next pass picks up the change.
    h.warmer.refresh().await.unwrap();
    let after = h.resolver.resolve(10, 5, false, true).await.unwrap_err();
    assert!(after.is_not_found());
    let admin = h.resolver.resolve(10, 5, true, true).await.unwrap();
    assert!(!admin.is_active);
}

#[tokio::test]
async fn test_deleted_banner_served_from_cache_until_expiry() {
    let store = Arc::new(InMemoryStore::new());
    let cache = Arc::new(LocalCache::new(64));
    let warmer = CacheWarmer::new(store.clone(), cache.clone(), Duration::from_millis(50), OP_TIMEOUT);
    let resolver = BannerResolver::new(store.clone(), cache.clone(), OP_TIMEOUT);

    let banner = store.create(promo(10, vec![5], true)).await.unwrap();
    warmer.refresh().await.unwrap();
    store.delete(banner.id).await.unwrap();

    assert_eq!(resolver.resolve(10, 5, false, true).await.unwrap().id, banner.id);
    assert!(resolver.resolve(10, 5, false, false).await.unwrap_err().is_not_found());

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(resolver.resolve(10, 5, false, true).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_concurrent_refreshes_and_lookups() {
    let h = harness();
    for i in 0..50 {
        h.store.create(promo(1 + i % 5, vec![i + 1, i + 100], true)).await.unwrap();
    }

    let first = {
        let warmer = h.warmer.clone();
        tokio::spawn(async move { warmer.refresh().await })
    };
    let second = {
        let warmer = h.warmer.clone();
        tokio::spawn(async move { warmer.refresh().await })
    };

    let resolver = Arc::new(h.resolver);
    let mut lookups = Vec::new();
    for i in 0..50 {
        let resolver = resolver.clone();
        lookups.push(tokio::spawn(async move {
            resolver.resolve(1 + i % 5, i + 1, false, true).await
        }));
    }

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(first.entries_written, 100);
    assert_eq!(second.entries_written, 100);

    for lookup in lookups {
        let banner = lookup.await.unwrap().unwrap();
        assert!(banner.is_active);
    }
}
