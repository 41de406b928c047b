//! Attendance routes: clock-in, clock-out and hour recalculation.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use domain::models::attendance::{
    ActiveAttendancesResponse, Attendance, ClockInRequest, ClockOutRequest, RecalculationSummary,
};
use domain::services::{audit_helpers, SiteAccessGuard};
use persistence::repositories::{
    AttendanceRepository, AuditLogRepository, CostAnalyticsRepository,
};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiResult;
use crate::extractors::{Auth, OwnerAuth};
use crate::middleware::metrics::record_clock_event;
use crate::middleware::CurrentRequestId;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clock-in", post(clock_in))
        .route("/clock-out", post(clock_out))
        .route("/active", get(list_active))
        .route("/recalculate", post(recalculate))
}

/// Opens a shift on a site of the caller's company.
pub async fn clock_in(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    CurrentRequestId(request_id): CurrentRequestId,
    Json(body): Json<ClockInRequest>,
) -> ApiResult<(StatusCode, Json<Attendance>)> {
    body.validate()?;

    SiteAccessGuard::new(
        CostAnalyticsRepository::new(state.pool.clone()),
        state.site_cache.clone(),
    )
    .ensure_site(ctx.company_id, body.site_id)
    .await?;

    let attendance = AttendanceRepository::new(state.pool.clone())
        .clock_in(ctx.company_id, ctx.user_id, body.site_id, body.location, Utc::now())
        .await?;

    info!(
        company_id = %ctx.company_id,
        site_id = %attendance.site_id,
        actor_id = %ctx.user_id,
        attendance_id = %attendance.id,
        "Clocked in"
    );
    AuditLogRepository::new(state.pool.clone()).insert_async(
        audit_helpers::clock_in(&attendance)
            .with_request_id(request_id)
            .build(),
    );
    record_clock_event("clock_in");

    Ok((StatusCode::CREATED, Json(attendance)))
}

/// Closes the caller's open shift and stores its hours.
pub async fn clock_out(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    CurrentRequestId(request_id): CurrentRequestId,
    body: Option<Json<ClockOutRequest>>,
) -> ApiResult<Json<Attendance>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    body.validate()?;

    let attendance = AttendanceRepository::new(state.pool.clone())
        .clock_out(ctx.company_id, ctx.user_id, body.location, Utc::now())
        .await?;

    info!(
        company_id = %ctx.company_id,
        site_id = %attendance.site_id,
        actor_id = %ctx.user_id,
        attendance_id = %attendance.id,
        total_hours = ?attendance.total_hours,
        "Clocked out"
    );
    AuditLogRepository::new(state.pool.clone()).insert_async(
        audit_helpers::clock_out(&attendance)
            .with_request_id(request_id)
            .build(),
    );
    record_clock_event("clock_out");

    Ok(Json(attendance))
}

/// Owners see every open shift of the company, workers only their own.
pub async fn list_active(
    State(state): State<AppState>,
    Auth(ctx): Auth,
) -> ApiResult<Json<ActiveAttendancesResponse>> {
    let user_filter = (!ctx.is_owner()).then_some(ctx.user_id);
    let data = AttendanceRepository::new(state.pool.clone())
        .list_active(ctx.company_id, user_filter)
        .await?;
    Ok(Json(ActiveAttendancesResponse { data }))
}

/// Re-derives stored hours of every completed shift of the company.
pub async fn recalculate(
    State(state): State<AppState>,
    OwnerAuth(ctx): OwnerAuth,
    CurrentRequestId(request_id): CurrentRequestId,
) -> ApiResult<Json<RecalculationSummary>> {
    let summary = AttendanceRepository::new(state.pool.clone())
        .recalculate_completed(ctx.company_id)
        .await?;

    info!(
        company_id = %ctx.company_id,
        actor_id = %ctx.user_id,
        examined = summary.examined,
        updated = summary.updated,
        "Attendance hours recalculated"
    );
    AuditLogRepository::new(state.pool.clone()).insert_async(
        audit_helpers::recalculated(ctx.company_id, ctx.user_id, &summary)
            .with_request_id(request_id)
            .build(),
    );

    Ok(Json(summary))
}
