//! Business logic over the domain models.
//!
//! Services depend on storage through the traits they declare
//! (`AbsenceRequestStore`, `CostDataSource`, `SiteDirectory`); the
//! persistence crate implements them over Postgres.

pub mod absence_workflow;
pub mod audit;
pub mod cost_analytics;
pub mod margin;
pub mod site_access;
pub mod work_hours;

pub use absence_workflow::{AbsenceAction, AbsenceRequestStore, AbsenceWorkflow};
pub use audit::{audit_helpers, AuditLogBuilder};
pub use cost_analytics::{CostAnalyticsService, CostDataSource};
pub use site_access::{NoopSiteCache, SiteAccessCache, SiteAccessGuard, SiteDirectory, TtlSiteCache};
pub use work_hours::{calculate_worked_hours, WorkedHours};
