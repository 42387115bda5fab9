use thiserror::Error;

/// Failures of the cache store. Callers treat every variant like a miss.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache capacity of {0} entries reached")]
    CapacityExceeded(usize),

    #[error("Cache operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("TTL of {0:?} cannot be represented")]
    TtlOutOfRange(std::time::Duration),
}
