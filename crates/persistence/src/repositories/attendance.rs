//! Attendance repository: clock-in, clock-out and hour recalculation.

use chrono::{DateTime, Utc};
use domain::error::{DomainError, DomainResult};
use domain::models::attendance::{Attendance, GeoPoint, RecalculationSummary};
use domain::services::work_hours::calculate_worked_hours;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::entities::{AttendanceEntity, ATTENDANCE_COLUMNS};
use crate::metrics::QueryTimer;

/// Hours currently stored on a completed attendance.
#[derive(Debug, FromRow)]
struct CompletedHoursRow {
    id: Uuid,
    clock_in_time: DateTime<Utc>,
    clock_out_time: DateTime<Utc>,
    presence_hours: Option<Decimal>,
    total_hours: Option<Decimal>,
    lunch_break_applied: bool,
}

fn coordinates(location: Option<GeoPoint>) -> (Option<f64>, Option<f64>, Option<f64>) {
    match location {
        Some(p) => (Some(p.latitude), Some(p.longitude), p.accuracy),
        None => (None, None, None),
    }
}

/// Repository for attendance rows.
#[derive(Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens an attendance, snapshotting the user's current hourly cost.
    ///
    /// The site must already be verified for the company. A second open
    /// attendance for the same user is rejected by the partial unique index
    /// and reported as `Conflict`.
    pub async fn clock_in(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        site_id: Uuid,
        location: Option<GeoPoint>,
        now: DateTime<Utc>,
    ) -> DomainResult<Attendance> {
        let (lat, lon, accuracy) = coordinates(location);
        let timer = QueryTimer::new("clock_in");
        let sql = format!(
            r#"
            INSERT INTO attendances (
                company_id, user_id, site_id, clock_in_time,
                clock_in_latitude, clock_in_longitude, clock_in_accuracy, hourly_cost
            )
            SELECT $1, u.id, $3, $4, $5, $6, $7, u.hourly_cost
            FROM users u
            WHERE u.id = $2 AND u.company_id = $1
            RETURNING {}
            "#,
            ATTENDANCE_COLUMNS
        );
        let result = sqlx::query_as::<_, AttendanceEntity>(&sql)
            .bind(company_id)
            .bind(user_id)
            .bind(site_id)
            .bind(now)
            .bind(lat)
            .bind(lon)
            .bind(accuracy)
            .fetch_optional(&self.pool)
            .await;
        timer.record();

        match result.map_err(DomainError::from) {
            Ok(Some(entity)) => Ok(entity.into()),
            Ok(None) => Err(DomainError::NotFound("User not found".to_string())),
            Err(DomainError::Conflict(_)) => Err(DomainError::Conflict(
                "User already has an open attendance".to_string(),
            )),
            Err(e) => Err(e),
        }
    }

    /// Closes the user's open attendance and stores the computed hours.
    pub async fn clock_out(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        location: Option<GeoPoint>,
        now: DateTime<Utc>,
    ) -> DomainResult<Attendance> {
        let timer = QueryTimer::new("clock_out");
        let mut tx = self.pool.begin().await?;

        let open = sqlx::query_as::<_, AttendanceEntity>(&format!(
            r#"
            SELECT {}
            FROM attendances
            WHERE user_id = $1 AND company_id = $2 AND clock_out_time IS NULL
            FOR UPDATE
            "#,
            ATTENDANCE_COLUMNS
        ))
        .bind(user_id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(open) = open else {
            tx.rollback().await?;
            timer.record();
            return Err(DomainError::InvalidState(
                "No open attendance to clock out from".to_string(),
            ));
        };

        let clock_out = now.max(open.clock_in_time);
        let hours = calculate_worked_hours(open.clock_in_time, clock_out);
        let (lat, lon, accuracy) = coordinates(location);

        let closed = sqlx::query_as::<_, AttendanceEntity>(&format!(
            r#"
            UPDATE attendances
            SET clock_out_time = $2,
                clock_out_latitude = $3,
                clock_out_longitude = $4,
                clock_out_accuracy = $5,
                presence_hours = $6,
                total_hours = $7,
                lunch_break_applied = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ATTENDANCE_COLUMNS
        ))
        .bind(open.id)
        .bind(clock_out)
        .bind(lat)
        .bind(lon)
        .bind(accuracy)
        .bind(hours.presence_hours)
        .bind(hours.worked_hours)
        .bind(hours.lunch_break_applied)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(closed.into())
    }

    /// Open attendances of the company, optionally for one user.
    pub async fn list_active(
        &self,
        company_id: Uuid,
        user_id: Option<Uuid>,
    ) -> DomainResult<Vec<Attendance>> {
        let timer = QueryTimer::new("list_active_attendances");
        let result = sqlx::query_as::<_, AttendanceEntity>(&format!(
            r#"
            SELECT {}
            FROM attendances
            WHERE company_id = $1 AND clock_out_time IS NULL
              AND ($2::uuid IS NULL OR user_id = $2)
            ORDER BY clock_in_time ASC
            "#,
            ATTENDANCE_COLUMNS
        ))
        .bind(company_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    /// Re-derives stored hours of every completed attendance of the company.
    pub async fn recalculate_completed(&self, company_id: Uuid) -> DomainResult<RecalculationSummary> {
        let timer = QueryTimer::new("recalculate_attendances");
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, CompletedHoursRow>(
            r#"
            SELECT id, clock_in_time, clock_out_time, presence_hours, total_hours,
                   lunch_break_applied
            FROM attendances
            WHERE company_id = $1 AND clock_out_time IS NOT NULL
            FOR UPDATE
            "#,
        )
        .bind(company_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut updated = 0_i64;
        for row in &rows {
            let hours = calculate_worked_hours(row.clock_in_time, row.clock_out_time);
            let unchanged = row.presence_hours == Some(hours.presence_hours)
                && row.total_hours == Some(hours.worked_hours)
                && row.lunch_break_applied == hours.lunch_break_applied;
            if unchanged {
                continue;
            }

            sqlx::query(
                r#"
                UPDATE attendances
                SET presence_hours = $2, total_hours = $3, lunch_break_applied = $4,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(row.id)
            .bind(hours.presence_hours)
            .bind(hours.worked_hours)
            .bind(hours.lunch_break_applied)
            .execute(&mut *tx)
            .await?;
            updated += 1;
        }

        tx.commit().await?;
        timer.record();

        let summary = RecalculationSummary {
            examined: rows.len() as i64,
            updated,
        };
        info!(
            company_id = %company_id,
            examined = summary.examined,
            updated = summary.updated,
            "Recalculated attendance hours"
        );
        Ok(summary)
    }
}
