//! Database entity definitions.
//!
//! Entities are direct mappings to database rows. Each entity converts into
//! its domain model with `From`.

/// Pairs a domain enum with its database twin, both directions.
macro_rules! db_enum_mapping {
    ($domain:ident <=> $db:ident { $($variant:ident),+ $(,)? }) => {
        impl From<$db> for $domain {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => $domain::$variant),+
                }
            }
        }

        impl From<$domain> for $db {
            fn from(value: $domain) -> Self {
                match value {
                    $($domain::$variant => $db::$variant),+
                }
            }
        }
    };
}

pub mod absence_request;
pub mod attendance;
pub mod audit_log;
pub mod site;

pub use absence_request::{
    AbsenceCategoryDb, AbsenceRequestEntity, AbsenceRequestRevisionEntity, AbsenceStatusDb,
    AbsenceTypeDb, DayPartDb, PermessoModeDb, ABSENCE_REQUEST_COLUMNS,
};
pub use attendance::{AttendanceEntity, ATTENDANCE_COLUMNS};
pub use audit_log::AuditLogEntity;
pub use site::{
    AttendanceCostEntity, ConstructionSiteEntity, MaterialCostEntity, MaterialUsageStateDb,
    SiteStatusDb,
};
