//! Cache synchronization for banner lookups.
//!
//! `CacheWarmer` denormalizes every banner into one cache entry per
//! `(feature, tag)` pair, `RefreshScheduler` drives it on a fixed interval,
//! and `BannerResolver` answers lookups from the cache or the record store.

#![warn(clippy::unwrap_used)]

mod bounded;
pub mod resolver;
pub mod scheduler;
pub mod warmer;

pub use resolver::BannerResolver;
pub use scheduler::{RefreshScheduler, RefreshStats};
pub use warmer::{CacheWarmer, RefreshReport};
