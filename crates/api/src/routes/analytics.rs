//! Owner-only cost and margin analytics.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use domain::models::analytics::{
    AnalyticsQuery, CompanyCostDashboard, SiteCostListResponse, SiteCostReport,
};
use domain::services::CostAnalyticsService;
use persistence::repositories::CostAnalyticsRepository;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiResult;
use crate::extractors::Auth;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sites", get(list_site_costs))
        .route("/sites/:site_id/costs", get(get_site_costs))
        .route("/dashboard", get(get_dashboard))
}

fn service(state: &AppState) -> CostAnalyticsService<CostAnalyticsRepository> {
    CostAnalyticsService::new(CostAnalyticsRepository::new(state.pool.clone()))
}

pub async fn get_site_costs(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(site_id): Path<Uuid>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<SiteCostReport>> {
    query.validate()?;
    let report = service(&state)
        .site_report(&ctx, site_id, query.range(), Utc::now())
        .await?;
    Ok(Json(report))
}

pub async fn list_site_costs(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<SiteCostListResponse>> {
    query.validate()?;
    let data = service(&state)
        .site_reports(&ctx, query.range(), Utc::now())
        .await?;
    Ok(Json(SiteCostListResponse { data }))
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<CompanyCostDashboard>> {
    query.validate()?;
    let dashboard = service(&state)
        .company_dashboard(&ctx, query.range(), Utc::now())
        .await?;
    Ok(Json(dashboard))
}
