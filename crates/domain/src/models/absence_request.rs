//! Absence request domain models (vacation and permission requests).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use shared::validation::{
    optional_clock_time, parse_clock_time, validate_date_order, validate_not_blank,
};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::error::{DomainError, FieldViolation};

/// Kind of absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbsenceType {
    /// Vacation, whole or half days.
    Ferie,
    /// Permission, by hours or by day.
    Permesso,
}

/// How a permission is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermessoMode {
    Hours,
    Day,
}

/// Workflow status of an absence request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbsenceStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    ChangesRequested,
}

/// Reason category of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbsenceCategory {
    #[serde(rename = "PERSONALE")]
    Personale,
    #[serde(rename = "MEDICO")]
    Medico,
    /// Leave granted under Italian law 104/92.
    #[serde(rename = "LEGGE_104")]
    Legge104,
    #[serde(rename = "ALTRO")]
    Altro,
}

/// Portion of a day covered by the absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayPart {
    Full,
    Am,
    Pm,
}

macro_rules! literal_enum {
    ($ty:ident { $($variant:ident => $lit:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $lit),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_uppercase().as_str() {
                    $($lit => Ok($ty::$variant),)+
                    _ => Err(format!(concat!("Unknown ", stringify!($ty), ": {}"), s)),
                }
            }
        }
    };
}

literal_enum!(AbsenceType { Ferie => "FERIE", Permesso => "PERMESSO" });
literal_enum!(PermessoMode { Hours => "HOURS", Day => "DAY" });
literal_enum!(AbsenceStatus {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
    Cancelled => "CANCELLED",
    ChangesRequested => "CHANGES_REQUESTED",
});
literal_enum!(AbsenceCategory {
    Personale => "PERSONALE",
    Medico => "MEDICO",
    Legge104 => "LEGGE_104",
    Altro => "ALTRO",
});
literal_enum!(DayPart { Full => "FULL", Am => "AM", Pm => "PM" });

impl AbsenceStatus {
    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AbsenceStatus::Approved | AbsenceStatus::Rejected | AbsenceStatus::Cancelled
        )
    }
}

/// A stored absence request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceRequest {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub company_id: Uuid,
    #[serde(rename = "type")]
    pub absence_type: AbsenceType,
    pub mode: Option<PermessoMode>,
    pub status: AbsenceStatus,
    pub category: Option<AbsenceCategory>,
    #[serde(rename = "is104")]
    pub is_104: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub day_part: Option<DayPart>,
    #[serde(with = "optional_clock_time", default)]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "optional_clock_time", default)]
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

impl AbsenceRequest {
    /// End of the covered interval; a missing end date means a single day.
    pub fn effective_end_date(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.start_date)
    }

    /// The user-editable fields as currently stored.
    pub fn fields(&self) -> ResolvedAbsenceFields {
        ResolvedAbsenceFields {
            absence_type: self.absence_type,
            mode: self.mode,
            category: self.category,
            is_104: self.is_104,
            start_date: self.start_date,
            end_date: self.end_date,
            day_part: self.day_part,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            notes: self.notes.clone(),
            attachment_url: self.attachment_url.clone(),
        }
    }
}

/// Before/after values of one field in a revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub before: JsonValue,
    pub after: JsonValue,
}

/// Immutable record of one resubmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceRequestRevision {
    pub id: Uuid,
    pub absence_request_id: Uuid,
    pub revision_number: i32,
    pub changed_by: Uuid,
    pub changes: BTreeMap<String, FieldSnapshot>,
    pub created_at: DateTime<Utc>,
}

/// Client payload for creating or resubmitting a request.
///
/// Times arrive as raw strings so that format problems are reported together
/// with every other violated constraint.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceRequestInput {
    #[serde(rename = "type")]
    pub absence_type: AbsenceType,
    #[serde(default)]
    pub mode: Option<PermessoMode>,
    #[serde(default)]
    pub category: Option<AbsenceCategory>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub day_part: Option<DayPart>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(url(message = "Attachment must be a valid URL"))]
    pub attachment_url: Option<String>,
}

/// Validated field set with derived values filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAbsenceFields {
    pub absence_type: AbsenceType,
    pub mode: Option<PermessoMode>,
    pub category: Option<AbsenceCategory>,
    pub is_104: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub day_part: Option<DayPart>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
    pub attachment_url: Option<String>,
}

fn forbidden(field: &str, message: &str) -> FieldViolation {
    FieldViolation::new(field, "forbidden", message)
}

fn required(field: &str, message: &str) -> FieldViolation {
    FieldViolation::new(field, "required", message)
}

fn parse_time_field(
    field: &str,
    value: &Option<String>,
    violations: &mut Vec<FieldViolation>,
) -> Option<NaiveTime> {
    let raw = value.as_deref()?;
    match parse_clock_time(raw) {
        Ok(time) => Some(time),
        Err(e) => {
            violations.push(FieldViolation::new(
                field,
                e.code.to_string(),
                e.message.map(|m| m.to_string()).unwrap_or_default(),
            ));
            None
        }
    }
}

/// Minutes between two times of the same day; non-positive spans yield `None`.
pub fn duration_minutes(start: NaiveTime, end: NaiveTime) -> Option<i32> {
    let minutes = (end - start).num_minutes();
    if minutes > 0 {
        i32::try_from(minutes).ok()
    } else {
        None
    }
}

impl AbsenceRequestInput {
    /// Checks the field combination for the requested type and mode.
    ///
    /// Returns every violated constraint at once.
    pub fn resolve(&self) -> Result<ResolvedAbsenceFields, DomainError> {
        let mut violations = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => match DomainError::from(errors) {
                DomainError::Validation(v) => v,
                _ => Vec::new(),
            },
        };

        if let Err(e) = validate_date_order(self.start_date, self.end_date) {
            violations.push(FieldViolation::new(
                "endDate",
                e.code.to_string(),
                e.message.map(|m| m.to_string()).unwrap_or_default(),
            ));
        }

        let single_day = self.end_date.map_or(true, |end| end == self.start_date);
        let mut start_time = None;
        let mut end_time = None;
        let mut duration = None;

        match self.absence_type {
            AbsenceType::Ferie => {
                if self.mode.is_some() {
                    violations.push(forbidden("mode", "Vacation requests have no mode"));
                }
                if self.category.is_some() {
                    violations.push(forbidden("category", "Vacation requests have no category"));
                }
                if self.start_time.is_some() {
                    violations.push(forbidden("startTime", "Vacation requests have no start time"));
                }
                if self.end_time.is_some() {
                    violations.push(forbidden("endTime", "Vacation requests have no end time"));
                }
                if self.day_part.is_some() && !single_day {
                    violations.push(FieldViolation::new(
                        "dayPart",
                        "single_day_only",
                        "Day part is only allowed for single-day vacation",
                    ));
                }
            }
            AbsenceType::Permesso => match self.mode {
                None => violations.push(required("mode", "Permission mode is required")),
                Some(PermessoMode::Hours) => {
                    if self.day_part.is_some() {
                        violations.push(forbidden(
                            "dayPart",
                            "Hourly permissions cannot set a day part",
                        ));
                    }
                    if self.start_time.is_none() {
                        violations.push(required("startTime", "Start time is required"));
                    }
                    if self.end_time.is_none() {
                        violations.push(required("endTime", "End time is required"));
                    }
                    start_time = parse_time_field("startTime", &self.start_time, &mut violations);
                    end_time = parse_time_field("endTime", &self.end_time, &mut violations);
                    if let (Some(start), Some(end)) = (start_time, end_time) {
                        duration = duration_minutes(start, end);
                    }
                }
                Some(PermessoMode::Day) => {
                    if self.day_part.is_none() {
                        violations.push(required("dayPart", "Day part is required"));
                    }
                    if self.start_time.is_some() {
                        violations.push(forbidden(
                            "startTime",
                            "Daily permissions cannot set a start time",
                        ));
                    }
                    if self.end_time.is_some() {
                        violations.push(forbidden(
                            "endTime",
                            "Daily permissions cannot set an end time",
                        ));
                    }
                }
            },
        }

        if !violations.is_empty() {
            return Err(DomainError::Validation(violations));
        }

        let category = match self.absence_type {
            AbsenceType::Ferie => None,
            AbsenceType::Permesso => self.category,
        };

        Ok(ResolvedAbsenceFields {
            absence_type: self.absence_type,
            mode: self.mode,
            category,
            is_104: category == Some(AbsenceCategory::Legge104),
            start_date: self.start_date,
            end_date: self.end_date,
            day_part: self.day_part,
            start_time,
            end_time,
            duration_minutes: duration,
            notes: self.notes.clone().filter(|n| !n.trim().is_empty()),
            attachment_url: self.attachment_url.clone(),
        })
    }
}

impl ResolvedAbsenceFields {
    fn snapshot(&self) -> BTreeMap<&'static str, JsonValue> {
        let time = |t: Option<NaiveTime>| t.map(|t| t.format("%H:%M").to_string());
        BTreeMap::from([
            ("type", json!(self.absence_type)),
            ("mode", json!(self.mode)),
            ("category", json!(self.category)),
            ("is104", json!(self.is_104)),
            ("startDate", json!(self.start_date)),
            ("endDate", json!(self.end_date)),
            ("dayPart", json!(self.day_part)),
            ("startTime", json!(time(self.start_time))),
            ("endTime", json!(time(self.end_time))),
            ("durationMinutes", json!(self.duration_minutes)),
            ("notes", json!(self.notes)),
            ("attachmentUrl", json!(self.attachment_url)),
        ])
    }

    /// Fields whose value differs between `self` (before) and `after`.
    pub fn diff(&self, after: &ResolvedAbsenceFields) -> BTreeMap<String, FieldSnapshot> {
        let before = self.snapshot();
        let mut after = after.snapshot();
        before
            .into_iter()
            .filter_map(|(field, old)| {
                let new = after.remove(field).unwrap_or(JsonValue::Null);
                (old != new).then(|| {
                    (
                        field.to_string(),
                        FieldSnapshot {
                            before: old,
                            after: new,
                        },
                    )
                })
            })
            .collect()
    }
}

/// Owner decision payload for approve and reject.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    #[serde(default)]
    #[validate(length(max = 2000, message = "Note is too long"))]
    pub note: Option<String>,
}

/// Owner payload asking the employee to amend the request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RequestChangesRequest {
    #[validate(
        custom(function = "validate_not_blank", message = "Requested changes cannot be blank"),
        length(max = 2000, message = "Requested changes are too long")
    )]
    pub requested_changes: String,
}

/// Filters for listing absence requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbsenceListFilter {
    pub employee_id: Option<Uuid>,
    pub status: Option<AbsenceStatus>,
    pub absence_type: Option<AbsenceType>,
    /// Requests ending on or after this date.
    pub from: Option<NaiveDate>,
    /// Requests starting on or before this date.
    pub to: Option<NaiveDate>,
}

/// Query parameters for listing absence requests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAbsenceRequestsQuery {
    pub employee_id: Option<Uuid>,
    pub status: Option<AbsenceStatus>,
    #[serde(rename = "type")]
    pub absence_type: Option<AbsenceType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListAbsenceRequestsQuery {
    pub fn filter(&self) -> AbsenceListFilter {
        AbsenceListFilter {
            employee_id: self.employee_id,
            status: self.status,
            absence_type: self.absence_type,
            from: self.from,
            to: self.to,
        }
    }
}

/// Query parameters for the overlap check.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapCheckQuery {
    pub employee_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub exclude_id: Option<Uuid>,
}

/// An approved request intersecting a candidate interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapWarning {
    pub id: Uuid,
    pub employee_id: Uuid,
    #[serde(rename = "type")]
    pub absence_type: AbsenceType,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub day_part: Option<DayPart>,
}

impl From<&AbsenceRequest> for OverlapWarning {
    fn from(request: &AbsenceRequest) -> Self {
        Self {
            id: request.id,
            employee_id: request.employee_id,
            absence_type: request.absence_type,
            start_date: request.start_date,
            end_date: request.end_date,
            day_part: request.day_part,
        }
    }
}

/// Response for create and resubmit: the request plus advisory overlaps.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceRequestWithWarnings {
    #[serde(flatten)]
    pub request: AbsenceRequest,
    pub overlap_warnings: Vec<OverlapWarning>,
}

/// Response for the overlap check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapCheckResponse {
    pub overlaps: Vec<OverlapWarning>,
}

/// Revision history, oldest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionListResponse {
    pub data: Vec<AbsenceRequestRevision>,
}

/// Response for listing absence requests.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAbsenceRequestsResponse {
    pub data: Vec<AbsenceRequest>,
    pub pagination: shared::pagination::Pagination,
}
