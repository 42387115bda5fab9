pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{BannerError, BannerResult};
pub use types::{AccessToken, Banner, BannerFilter, BannerPayload, CacheKey};
