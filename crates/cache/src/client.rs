//! Redis cache client for denormalized banner entries.

use crate::error::CacheError;
use crate::store::CacheStore;
use async_trait::async_trait;
use banner_core::config::RedisConfig;
use banner_core::CacheKey;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, info};

/// Redis-backed distributed cache. Expiry is delegated to `SET ... EX`.
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    /// Connect to Redis and verify the connection with a PING.
    pub async fn new(config: &RedisConfig) -> anyhow::Result<Self> {
        let url = config
            .urls
            .first()
            .cloned()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        info!(url = %url, "Connecting to Redis");

        let client = redis::Client::open(url.as_str())?;

        let connect_timeout = Duration::from_millis(config.connect_timeout_ms);
        let mut conn =
            tokio::time::timeout(connect_timeout, client.get_multiplexed_async_connection())
                .await
                .map_err(|_| CacheError::Timeout(connect_timeout))??;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!(response = %pong, "Redis connection established");

        Ok(Self { client })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let data: Option<String> = conn.get(key.to_string()).await?;
        if data.is_none() {
            debug!(key = %key, "Redis miss");
        }
        Ok(data)
    }

    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // EX rejects zero; a sub-second TTL still gets one second.
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key.to_string(), value, ttl_secs)
            .await?;
        Ok(())
    }
}
