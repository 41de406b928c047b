//! Domain layer for the Cantiere backend.
//!
//! This crate contains:
//! - Domain models (absence requests, attendances, sites, cost reports)
//! - The absence workflow, worked-hours and cost/margin services
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::{DomainError, DomainResult, ErrorKind, FieldViolation};
