//! Absence request entities (database row mappings).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use domain::models::absence_request::{
    AbsenceCategory, AbsenceRequest, AbsenceRequestRevision, AbsenceStatus, AbsenceType, DayPart,
    PermessoMode,
};
use domain::DomainError;
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for absence types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "absence_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbsenceTypeDb {
    Ferie,
    Permesso,
}

/// Database enum for permission modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "permesso_mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermessoModeDb {
    Hours,
    Day,
}

/// Database enum for absence request statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "absence_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbsenceStatusDb {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    ChangesRequested,
}

/// Database enum for permission categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "absence_category", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbsenceCategoryDb {
    Personale,
    Medico,
    #[sqlx(rename = "LEGGE_104")]
    Legge104,
    Altro,
}

/// Database enum for day parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "day_part", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayPartDb {
    Full,
    Am,
    Pm,
}

db_enum_mapping!(AbsenceType <=> AbsenceTypeDb { Ferie, Permesso });
db_enum_mapping!(PermessoMode <=> PermessoModeDb { Hours, Day });
db_enum_mapping!(AbsenceStatus <=> AbsenceStatusDb {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    ChangesRequested,
});
db_enum_mapping!(AbsenceCategory <=> AbsenceCategoryDb { Personale, Medico, Legge104, Altro });
db_enum_mapping!(DayPart <=> DayPartDb { Full, Am, Pm });

/// Column list shared by every absence request query.
pub const ABSENCE_REQUEST_COLUMNS: &str = r#"
    id, employee_id, company_id, type AS absence_type, mode, status, category, is_104,
    start_date, end_date, day_part, start_time, end_time, duration_minutes, notes,
    attachment_url, decision_by, decision_at, decision_note, requested_changes,
    revision_number, created_at, updated_at
"#;

/// Database row mapping for the absence_requests table.
#[derive(Debug, Clone, FromRow)]
pub struct AbsenceRequestEntity {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub company_id: Uuid,
    pub absence_type: AbsenceTypeDb,
    pub mode: Option<PermessoModeDb>,
    pub status: AbsenceStatusDb,
    pub category: Option<AbsenceCategoryDb>,
    pub is_104: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub day_part: Option<DayPartDb>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
    pub attachment_url: Option<String>,
    pub decision_by: Option<Uuid>,
    pub decision_at: Option<DateTime<Utc>>,
    pub decision_note: Option<String>,
    pub requested_changes: Option<String>,
    pub revision_number: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AbsenceRequestEntity> for AbsenceRequest {
    fn from(e: AbsenceRequestEntity) -> Self {
        Self {
            id: e.id,
            employee_id: e.employee_id,
            company_id: e.company_id,
            absence_type: e.absence_type.into(),
            mode: e.mode.map(Into::into),
            status: e.status.into(),
            category: e.category.map(Into::into),
            is_104: e.is_104,
            start_date: e.start_date,
            end_date: e.end_date,
            day_part: e.day_part.map(Into::into),
            start_time: e.start_time,
            end_time: e.end_time,
            duration_minutes: e.duration_minutes,
            notes: e.notes,
            attachment_url: e.attachment_url,
            decision_by: e.decision_by,
            decision_at: e.decision_at,
            decision_note: e.decision_note,
            requested_changes: e.requested_changes,
            revision_number: e.revision_number,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// Database row mapping for the absence_request_revisions table.
#[derive(Debug, Clone, FromRow)]
pub struct AbsenceRequestRevisionEntity {
    pub id: Uuid,
    pub absence_request_id: Uuid,
    pub revision_number: i32,
    pub changed_by: Uuid,
    pub changes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AbsenceRequestRevisionEntity> for AbsenceRequestRevision {
    type Error = DomainError;

    fn try_from(e: AbsenceRequestRevisionEntity) -> Result<Self, Self::Error> {
        let changes = serde_json::from_value(e.changes).map_err(|err| {
            DomainError::Storage(format!(
                "revision {} of absence request {} has unreadable changes: {}",
                e.revision_number, e.absence_request_id, err
            ))
        })?;
        Ok(Self {
            id: e.id,
            absence_request_id: e.absence_request_id,
            revision_number: e.revision_number,
            changed_by: e.changed_by,
            changes,
            created_at: e.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_roundtrip() {
        for status in [
            AbsenceStatus::Pending,
            AbsenceStatus::Approved,
            AbsenceStatus::Rejected,
            AbsenceStatus::Cancelled,
            AbsenceStatus::ChangesRequested,
        ] {
            let db: AbsenceStatusDb = status.into();
            assert_eq!(AbsenceStatus::from(db), status);
        }
    }

    fn revision_row(changes: serde_json::Value) -> AbsenceRequestRevisionEntity {
        AbsenceRequestRevisionEntity {
            id: Uuid::new_v4(),
            absence_request_id: Uuid::new_v4(),
            revision_number: 2,
            changed_by: Uuid::new_v4(),
            changes,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_revision_entity_parses_changes() {
        let entity = revision_row(serde_json::json!({
            "endDate": { "before": "2024-05-10", "after": "2024-05-12" }
        }));

        let revision = AbsenceRequestRevision::try_from(entity).unwrap();
        assert_eq!(revision.revision_number, 2);
        assert_eq!(revision.changes["endDate"].after, serde_json::json!("2024-05-12"));
    }

    #[test]
    fn test_corrupt_revision_changes_are_a_storage_error() {
        for changes in [
            serde_json::json!("not a map"),
            serde_json::json!({ "endDate": 42 }),
        ] {
            let err = AbsenceRequestRevision::try_from(revision_row(changes)).unwrap_err();
            assert!(matches!(err, DomainError::Storage(_)), "{err:?}");
        }
    }

    #[test]
    fn test_entity_to_domain() {
        let now = Utc::now();
        let entity = AbsenceRequestEntity {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            absence_type: AbsenceTypeDb::Permesso,
            mode: Some(PermessoModeDb::Hours),
            status: AbsenceStatusDb::ChangesRequested,
            category: Some(AbsenceCategoryDb::Legge104),
            is_104: true,
            start_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            end_date: None,
            day_part: None,
            start_time: NaiveTime::from_hms_opt(9, 0, 0),
            end_time: NaiveTime::from_hms_opt(11, 0, 0),
            duration_minutes: Some(120),
            notes: None,
            attachment_url: None,
            decision_by: None,
            decision_at: None,
            decision_note: None,
            requested_changes: Some("Usa il pomeriggio".to_string()),
            revision_number: 1,
            created_at: now,
            updated_at: now,
        };

        let request = AbsenceRequest::from(entity);
        assert_eq!(request.absence_type, AbsenceType::Permesso);
        assert_eq!(request.category, Some(AbsenceCategory::Legge104));
        assert_eq!(request.status, AbsenceStatus::ChangesRequested);
    }
}
