//! Record store interfaces. The store is the single source of truth for
//! banners and access tokens; everything else holds derived copies.

use async_trait::async_trait;
use banner_core::{AccessToken, Banner, BannerFilter, BannerPayload, BannerResult};

#[async_trait]
pub trait BannerRepository: Send + Sync {
    /// Every banner, active or not, ordered by id.
    async fn find_all(&self) -> BannerResult<Vec<Banner>>;

    /// First banner (lowest id) matching the filter, or `NotFound`.
    async fn find_one(&self, filter: &BannerFilter) -> BannerResult<Banner>;

    /// Banners matching the filter with `offset`/`limit` applied.
    async fn find(&self, filter: &BannerFilter) -> BannerResult<Vec<Banner>>;

    async fn get(&self, id: u64) -> BannerResult<Banner>;

    async fn create(&self, payload: BannerPayload) -> BannerResult<Banner>;

    /// Replace every mutable field and refresh `updated_at`.
    async fn update(&self, id: u64, payload: BannerPayload) -> BannerResult<Banner>;

    async fn delete(&self, id: u64) -> BannerResult<()>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn find_by_token(&self, token: &str) -> BannerResult<Option<AccessToken>>;

    /// Insert a token, or return the existing record when the string is taken.
    async fn insert(&self, token: &str, is_admin: bool) -> BannerResult<AccessToken>;
}
