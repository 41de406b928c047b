//! Shared utilities and common types for the Cantiere backend.
//!
//! This crate provides functionality used across the other crates:
//! - Access-token verification and claims
//! - Offset pagination
//! - Reusable field validators

pub mod jwt;
pub mod pagination;
pub mod validation;
