//! In-memory record store backed by DashMap.
//!
//! Production: replace with PostgreSQL (sqlx) or similar ACID store.
//! This provides the same API surface for development and testing.

use crate::repository::{BannerRepository, TokenRepository};
use async_trait::async_trait;
use banner_core::{AccessToken, Banner, BannerError, BannerFilter, BannerPayload, BannerResult};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Thread-safe in-memory store for banners and access tokens.
pub struct InMemoryStore {
    banners: DashMap<u64, Banner>,
    tokens: DashMap<String, AccessToken>,
    next_banner_id: AtomicU64,
    next_token_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        info!("Record store initialized (in-memory, development mode)");
        Self {
            banners: DashMap::new(),
            tokens: DashMap::new(),
            next_banner_id: AtomicU64::new(1),
            next_token_id: AtomicU64::new(1),
        }
    }

    /// Insert the `user` and `admin` tokens.
    pub async fn seed_default_tokens(&self) -> BannerResult<()> {
        self.insert("user", false).await?;
        self.insert("admin", true).await?;
        info!("Default access tokens seeded");
        Ok(())
    }

    pub fn banner_count(&self) -> usize {
        self.banners.len()
    }

    fn sorted_matching(&self, filter: &BannerFilter) -> Vec<Banner> {
        let mut banners: Vec<Banner> = self
            .banners
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        banners.sort_by_key(|b| b.id);
        banners
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BannerRepository for InMemoryStore {
    async fn find_all(&self) -> BannerResult<Vec<Banner>> {
        Ok(self.sorted_matching(&BannerFilter::default()))
    }

    async fn find_one(&self, filter: &BannerFilter) -> BannerResult<Banner> {
        self.banners
            .iter()
            .filter(|r| filter.matches(r.value()))
            .min_by_key(|r| *r.key())
            .map(|r| r.value().clone())
            .ok_or(BannerError::NotFound)
    }

    async fn find(&self, filter: &BannerFilter) -> BannerResult<Vec<Banner>> {
        let matching = self.sorted_matching(filter).into_iter().skip(filter.offset);
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn get(&self, id: u64) -> BannerResult<Banner> {
        self.banners
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(BannerError::NotFound)
    }

    async fn create(&self, payload: BannerPayload) -> BannerResult<Banner> {
        let payload = payload.validated()?;
        let now = Utc::now();
        let banner = Banner {
            id: self.next_banner_id.fetch_add(1, Ordering::Relaxed),
            feature_id: payload.feature_id,
            tag_ids: payload.tag_ids,
            title: payload.title,
            text: payload.text,
            url: payload.url,
            is_active: payload.is_active,
            created_at: now,
            updated_at: now,
        };
        self.banners.insert(banner.id, banner.clone());
        debug!(banner_id = banner.id, feature_id = banner.feature_id, "Banner created");
        Ok(banner)
    }

    async fn update(&self, id: u64, payload: BannerPayload) -> BannerResult<Banner> {
        let payload = payload.validated()?;
        let mut entry = self.banners.get_mut(&id).ok_or(BannerError::NotFound)?;
        let banner = entry.value_mut();
        banner.feature_id = payload.feature_id;
        banner.tag_ids = payload.tag_ids;
        banner.title = payload.title;
        banner.text = payload.text;
        banner.url = payload.url;
        banner.is_active = payload.is_active;
        banner.updated_at = Utc::now();
        debug!(banner_id = id, is_active = banner.is_active, "Banner updated");
        Ok(banner.clone())
    }

    async fn delete(&self, id: u64) -> BannerResult<()> {
        match self.banners.remove(&id) {
            Some(_) => {
                debug!(banner_id = id, "Banner deleted");
                Ok(())
            }
            None => Err(BannerError::NotFound),
        }
    }
}

#[async_trait]
impl TokenRepository for InMemoryStore {
    async fn find_by_token(&self, token: &str) -> BannerResult<Option<AccessToken>> {
        Ok(self.tokens.get(token).map(|r| r.value().clone()))
    }

    async fn insert(&self, token: &str, is_admin: bool) -> BannerResult<AccessToken> {
        if token.is_empty() {
            return Err(BannerError::Validation("token must not be empty".to_string()));
        }
        let record = self
            .tokens
            .entry(token.to_string())
            .or_insert_with(|| AccessToken {
                id: self.next_token_id.fetch_add(1, Ordering::Relaxed),
                token: token.to_string(),
                is_admin,
            });
        Ok(record.value().clone())
    }
}
