//! Attendance entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::attendance::{Attendance, ClockEvent, GeoPoint};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Column list shared by every attendance query.
pub const ATTENDANCE_COLUMNS: &str = r#"
    id, company_id, user_id, site_id,
    clock_in_time, clock_in_latitude, clock_in_longitude, clock_in_accuracy,
    clock_out_time, clock_out_latitude, clock_out_longitude, clock_out_accuracy,
    presence_hours, total_hours, lunch_break_applied, hourly_cost, created_at, updated_at
"#;

/// Database row mapping for the attendances table.
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceEntity {
    pub id: Uuid,
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub site_id: Uuid,
    pub clock_in_time: DateTime<Utc>,
    pub clock_in_latitude: Option<f64>,
    pub clock_in_longitude: Option<f64>,
    pub clock_in_accuracy: Option<f64>,
    pub clock_out_time: Option<DateTime<Utc>>,
    pub clock_out_latitude: Option<f64>,
    pub clock_out_longitude: Option<f64>,
    pub clock_out_accuracy: Option<f64>,
    pub presence_hours: Option<Decimal>,
    pub total_hours: Option<Decimal>,
    pub lunch_break_applied: bool,
    pub hourly_cost: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn geo_point(lat: Option<f64>, lon: Option<f64>, accuracy: Option<f64>) -> Option<GeoPoint> {
    match (lat, lon) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint {
            latitude,
            longitude,
            accuracy,
        }),
        _ => None,
    }
}

impl From<AttendanceEntity> for Attendance {
    fn from(e: AttendanceEntity) -> Self {
        let clock_out = e.clock_out_time.map(|time| ClockEvent {
            time,
            location: geo_point(e.clock_out_latitude, e.clock_out_longitude, e.clock_out_accuracy),
        });
        Self {
            id: e.id,
            company_id: e.company_id,
            user_id: e.user_id,
            site_id: e.site_id,
            clock_in: ClockEvent {
                time: e.clock_in_time,
                location: geo_point(e.clock_in_latitude, e.clock_in_longitude, e.clock_in_accuracy),
            },
            clock_out,
            presence_hours: e.presence_hours,
            total_hours: e.total_hours,
            lunch_break_applied: e.lunch_break_applied,
            hourly_cost: e.hourly_cost,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}
