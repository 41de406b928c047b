//! Audit log listing for company owners.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use domain::models::audit_log::{ListAuditLogsQuery, ListAuditLogsResponse};
use persistence::repositories::AuditLogRepository;
use shared::pagination::{PageRequest, Pagination};

use crate::app::AppState;
use crate::error::ApiResult;
use crate::extractors::OwnerAuth;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_audit_logs))
}

/// Newest first, filterable by actor, action and resource.
pub async fn list_audit_logs(
    State(state): State<AppState>,
    OwnerAuth(ctx): OwnerAuth,
    Query(query): Query<ListAuditLogsQuery>,
) -> ApiResult<Json<ListAuditLogsResponse>> {
    let (data, total) = AuditLogRepository::new(state.pool.clone())
        .list(ctx.company_id, &query)
        .await?;

    Ok(Json(ListAuditLogsResponse {
        data,
        pagination: Pagination::new(PageRequest::new(query.page, query.per_page), total),
    }))
}
