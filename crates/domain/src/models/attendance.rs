//! Attendance (clock-in/clock-out) domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Coordinates captured with a clock event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,
    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,
    #[validate(range(min = 0.0, message = "Accuracy must be non-negative"))]
    pub accuracy: Option<f64>,
}

/// One side of a shift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockEvent {
    pub time: DateTime<Utc>,
    pub location: Option<GeoPoint>,
}

/// A worked shift. A missing clock-out means the shift is still open.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: Uuid,
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub site_id: Uuid,
    pub clock_in: ClockEvent,
    pub clock_out: Option<ClockEvent>,
    pub presence_hours: Option<Decimal>,
    pub total_hours: Option<Decimal>,
    pub lunch_break_applied: bool,
    /// Hourly cost of the user at clock-in time.
    pub hourly_cost: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Attendance {
    pub fn is_active(&self) -> bool {
        self.clock_out.is_none()
    }
}

/// Request body for clocking in.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClockInRequest {
    pub site_id: Uuid,
    #[serde(default)]
    #[validate(nested)]
    pub location: Option<GeoPoint>,
}

/// Request body for clocking out.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClockOutRequest {
    #[serde(default)]
    #[validate(nested)]
    pub location: Option<GeoPoint>,
}

/// Outcome of re-deriving hours for completed attendances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalculationSummary {
    pub examined: i64,
    pub updated: i64,
}

/// Open attendances visible to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAttendancesResponse {
    pub data: Vec<Attendance>,
}
