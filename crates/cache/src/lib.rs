#![warn(clippy::unwrap_used)]

pub mod client;
pub mod error;
pub mod local;
pub mod store;

pub use client::RedisCache;
pub use error::CacheError;
pub use local::LocalCache;
pub use store::CacheStore;
