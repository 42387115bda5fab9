#![warn(clippy::unwrap_used)]

pub mod memory;
pub mod repository;

pub use memory::InMemoryStore;
pub use repository::{BannerRepository, TokenRepository};
