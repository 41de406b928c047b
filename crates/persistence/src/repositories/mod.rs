//! Repository implementations for database operations.

pub mod absence_request;
pub mod analytics;
pub mod attendance;
pub mod audit_log;

pub use absence_request::AbsenceRequestRepository;
pub use analytics::CostAnalyticsRepository;
pub use attendance::AttendanceRepository;
pub use audit_log::AuditLogRepository;
