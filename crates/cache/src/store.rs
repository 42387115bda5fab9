//! Key/value cache interface with per-key expiry.

use crate::error::CacheError;
use async_trait::async_trait;
use banner_core::CacheKey;
use std::time::Duration;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Stored value, or `None` when the key is absent or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError>;

    /// Unconditionally overwrite `key`; the entry expires after `ttl`.
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), CacheError>;
}
