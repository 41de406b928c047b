//! HTTP route handlers.

pub mod absence_requests;
pub mod analytics;
pub mod attendance;
pub mod audit_logs;
pub mod health;
