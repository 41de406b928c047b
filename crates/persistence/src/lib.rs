//! Persistence layer for the Cantiere backend.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations of the domain store traits
//! - Query duration metrics

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
