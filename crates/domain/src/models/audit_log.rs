//! Append-only record of who changed what.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Who performed an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    /// Authenticated company user.
    User,
    /// Automated process (recalculation jobs, migrations).
    System,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::User => "user",
            ActorType::System => "system",
        }
    }
}

impl FromStr for ActorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [ActorType::User, ActorType::System]
            .into_iter()
            .find(|actor| actor.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown actor type: {}", s))
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audited actions. Stored and filtered by their `resource.operation` name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    AbsenceCreate,
    AbsenceResubmit,
    AbsenceApprove,
    AbsenceReject,
    AbsenceRequestChanges,
    AbsenceCancel,

    AttendanceClockIn,
    AttendanceClockOut,
    AttendanceRecalculate,
}

impl AuditAction {
    pub const ALL: [AuditAction; 9] = [
        AuditAction::AbsenceCreate,
        AuditAction::AbsenceResubmit,
        AuditAction::AbsenceApprove,
        AuditAction::AbsenceReject,
        AuditAction::AbsenceRequestChanges,
        AuditAction::AbsenceCancel,
        AuditAction::AttendanceClockIn,
        AuditAction::AttendanceClockOut,
        AuditAction::AttendanceRecalculate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::AbsenceCreate => "absence.create",
            AuditAction::AbsenceResubmit => "absence.resubmit",
            AuditAction::AbsenceApprove => "absence.approve",
            AuditAction::AbsenceReject => "absence.reject",
            AuditAction::AbsenceRequestChanges => "absence.request_changes",
            AuditAction::AbsenceCancel => "absence.cancel",
            AuditAction::AttendanceClockIn => "attendance.clock_in",
            AuditAction::AttendanceClockOut => "attendance.clock_out",
            AuditAction::AttendanceRecalculate => "attendance.recalculate",
        }
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("Unknown audit action: {}", s))
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Before/after value of one field. `None` means the field was unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Option<JsonValue>,
    pub new: Option<JsonValue>,
}

impl FieldChange {
    pub fn new(old: Option<JsonValue>, new: Option<JsonValue>) -> Self {
        Self { old, new }
    }
}

/// Field changes keyed by camelCase field name, in stable order.
pub type FieldChanges = BTreeMap<String, FieldChange>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub company_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor: AuditActor,
    pub action: String,
    pub resource: AuditResource,
    pub changes: Option<FieldChanges>,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditActor {
    /// Absent for system actions.
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub actor_type: ActorType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Absent for actions spanning many rows.
    pub id: Option<String>,
}

/// A row to append to `audit_logs`; see `services::audit::AuditLogBuilder`.
#[derive(Debug, Clone)]
pub struct CreateAuditLogInput {
    pub company_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub actor_type: ActorType,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub changes: Option<FieldChanges>,
    pub request_id: Option<String>,
}

/// Filters for `GET /audit-logs`. The company always comes from the caller.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListAuditLogsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub actor_id: Option<Uuid>,
    /// Exact action name, e.g. `absence.approve`.
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListAuditLogsResponse {
    pub data: Vec<AuditLog>,
    pub pagination: shared::pagination::Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_type_parses_case_insensitively() {
        assert_eq!(ActorType::from_str("user").unwrap(), ActorType::User);
        assert_eq!(ActorType::from_str("SYSTEM").unwrap(), ActorType::System);
        assert!(ActorType::from_str("api_key").is_err());
    }

    #[test]
    fn every_action_parses_from_its_name() {
        for action in AuditAction::ALL {
            assert_eq!(AuditAction::from_str(&action.to_string()).unwrap(), action);
        }
        assert!(AuditAction::from_str("absence.delete").is_err());
    }

    #[test]
    fn action_names_are_dotted() {
        assert_eq!(AuditAction::AbsenceRequestChanges.to_string(), "absence.request_changes");
        assert_eq!(AuditAction::AttendanceClockIn.to_string(), "attendance.clock_in");
    }

    #[test]
    fn actor_and_resource_serialize_type_key() {
        let log = AuditLog {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor: AuditActor {
                id: None,
                actor_type: ActorType::System,
            },
            action: "attendance.recalculate".to_string(),
            resource: AuditResource {
                resource_type: "attendance".to_string(),
                id: None,
            },
            changes: None,
            request_id: Some("req-1".to_string()),
        };
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["actor"]["type"], "system");
        assert_eq!(json["resource"]["type"], "attendance");
        assert_eq!(json["requestId"], "req-1");
    }
}
