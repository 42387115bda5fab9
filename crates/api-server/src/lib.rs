#![warn(clippy::unwrap_used)]

pub mod auth;
pub mod rest;
pub mod server;

pub use rest::AppState;
pub use server::{router, ApiServer};
