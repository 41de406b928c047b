//! Domain models for the Cantiere backend.

pub mod absence_request;
pub mod analytics;
pub mod attendance;
pub mod audit_log;
pub mod auth;
pub mod site;

pub use absence_request::{
    AbsenceCategory, AbsenceRequest, AbsenceRequestInput, AbsenceRequestRevision, AbsenceStatus,
    AbsenceType, DayPart, PermessoMode, ResolvedAbsenceFields,
};
pub use attendance::Attendance;
pub use audit_log::{ActorType, AuditAction, CreateAuditLogInput, FieldChange};
pub use auth::{AuthContext, Role};
pub use site::{ConstructionSite, MaterialUsageState, SiteStatus};
