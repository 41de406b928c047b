//! Custom Axum extractors.

pub mod auth;

pub use auth::{authenticate, Auth, OwnerAuth};
