//! Deadlines for calls into the external stores.

use banner_cache::CacheError;
use banner_core::{BannerError, BannerResult};
use std::future::Future;
use std::time::Duration;

pub(crate) async fn store_call<T, F>(limit: Duration, fut: F) -> BannerResult<T>
where
    F: Future<Output = BannerResult<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| BannerError::Store(format!("record store call timed out after {limit:?}")))?
}

pub(crate) async fn cache_call<T, F>(limit: Duration, fut: F) -> Result<T, CacheError>
where
    F: Future<Output = Result<T, CacheError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| CacheError::Timeout(limit))?
}
