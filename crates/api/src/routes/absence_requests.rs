//! Absence request routes: filing, review workflow and overlap checks.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use domain::models::absence_request::{
    AbsenceRequest, AbsenceRequestInput, AbsenceRequestWithWarnings, DecisionRequest,
    ListAbsenceRequestsQuery, ListAbsenceRequestsResponse, OverlapCheckQuery,
    OverlapCheckResponse, RequestChangesRequest, RevisionListResponse,
};
use domain::models::AuthContext;
use domain::services::{audit_helpers, AbsenceAction, AbsenceWorkflow};
use domain::DomainResult;
use persistence::repositories::{AbsenceRequestRepository, AuditLogRepository};
use shared::pagination::{PageRequest, Pagination};
use std::future::Future;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiResult;
use crate::extractors::Auth;
use crate::middleware::metrics::record_absence_transition;
use crate::middleware::CurrentRequestId;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_absence_request).get(list_absence_requests))
        .route("/check-overlaps", get(check_overlaps))
        .route("/:request_id", get(get_absence_request))
        .route("/:request_id/revisions", get(list_revisions))
        .route("/:request_id/approve", post(approve_absence_request))
        .route("/:request_id/reject", post(reject_absence_request))
        .route(
            "/:request_id/request-changes",
            post(request_changes_absence_request),
        )
        .route("/:request_id/cancel", post(cancel_absence_request))
        .route("/:request_id/resubmit", post(resubmit_absence_request))
}

fn workflow(state: &AppState) -> AbsenceWorkflow<AbsenceRequestRepository> {
    AbsenceWorkflow::new(AbsenceRequestRepository::new(state.pool.clone()))
        .with_overlap_limit(state.config.absence.overlap_warning_limit)
}

/// Files a request for the caller. Overlapping approved absences are
/// returned as warnings, never as errors.
pub async fn create_absence_request(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    CurrentRequestId(request_id): CurrentRequestId,
    Json(input): Json<AbsenceRequestInput>,
) -> ApiResult<(StatusCode, Json<AbsenceRequestWithWarnings>)> {
    let workflow = workflow(&state);
    let request = workflow.create(&ctx, &input).await?;
    let overlap_warnings = workflow.overlaps_for(&ctx, &request).await?;

    AuditLogRepository::new(state.pool.clone()).insert_async(
        audit_helpers::absence_created(ctx.user_id, &request)
            .with_request_id(request_id)
            .build(),
    );
    record_absence_transition("create");

    Ok((
        StatusCode::CREATED,
        Json(AbsenceRequestWithWarnings {
            request,
            overlap_warnings,
        }),
    ))
}

pub async fn list_absence_requests(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Query(query): Query<ListAbsenceRequestsQuery>,
) -> ApiResult<Json<ListAbsenceRequestsResponse>> {
    let page = PageRequest::new(query.page, query.per_page);
    let (data, total) = workflow(&state).list(&ctx, query.filter(), page).await?;

    Ok(Json(ListAbsenceRequestsResponse {
        data,
        pagination: Pagination::new(page, total),
    }))
}

pub async fn get_absence_request(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(request_id): Path<Uuid>,
) -> ApiResult<Json<AbsenceRequest>> {
    Ok(Json(workflow(&state).get(&ctx, request_id).await?))
}

pub async fn list_revisions(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Path(request_id): Path<Uuid>,
) -> ApiResult<Json<RevisionListResponse>> {
    let data = workflow(&state).revisions(&ctx, request_id).await?;
    Ok(Json(RevisionListResponse { data }))
}

/// Approved absences intersecting a candidate interval. Defaults to the
/// caller's own calendar.
pub async fn check_overlaps(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    Query(query): Query<OverlapCheckQuery>,
) -> ApiResult<Json<OverlapCheckResponse>> {
    let overlaps = workflow(&state)
        .check_overlaps(
            &ctx,
            query.employee_id.unwrap_or(ctx.user_id),
            query.start_date,
            query.end_date,
            query.exclude_id,
        )
        .await?;
    Ok(Json(OverlapCheckResponse { overlaps }))
}

/// Runs one review action and writes its audit entry.
async fn audited<F, Fut>(
    state: &AppState,
    ctx: &AuthContext,
    request_id: Option<String>,
    id: Uuid,
    action: AbsenceAction,
    apply: F,
) -> ApiResult<Json<AbsenceRequest>>
where
    F: FnOnce(AbsenceWorkflow<AbsenceRequestRepository>) -> Fut,
    Fut: Future<Output = DomainResult<AbsenceRequest>>,
{
    let before = workflow(state).get(ctx, id).await?;
    let after = apply(workflow(state)).await?;

    AuditLogRepository::new(state.pool.clone()).insert_async(
        audit_helpers::absence_transitioned(ctx.user_id, action, &before, &after)
            .with_request_id(request_id)
            .build(),
    );
    record_absence_transition(action.as_str());
    Ok(Json(after))
}

fn decision_note(body: Option<Json<DecisionRequest>>) -> ApiResult<Option<String>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    body.validate()?;
    Ok(body.note)
}

pub async fn approve_absence_request(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    CurrentRequestId(request_id): CurrentRequestId,
    Path(id): Path<Uuid>,
    body: Option<Json<DecisionRequest>>,
) -> ApiResult<Json<AbsenceRequest>> {
    let note = decision_note(body)?;
    audited(&state, &ctx, request_id, id, AbsenceAction::Approve, |wf| async move {
        wf.approve(&ctx, id, note).await
    })
    .await
}

/// Rejection requires a non-blank note.
pub async fn reject_absence_request(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    CurrentRequestId(request_id): CurrentRequestId,
    Path(id): Path<Uuid>,
    body: Option<Json<DecisionRequest>>,
) -> ApiResult<Json<AbsenceRequest>> {
    let note = decision_note(body)?;
    audited(&state, &ctx, request_id, id, AbsenceAction::Reject, |wf| async move {
        wf.reject(&ctx, id, note).await
    })
    .await
}

pub async fn request_changes_absence_request(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    CurrentRequestId(request_id): CurrentRequestId,
    Path(id): Path<Uuid>,
    Json(body): Json<RequestChangesRequest>,
) -> ApiResult<Json<AbsenceRequest>> {
    body.validate()?;
    let changes = body.requested_changes;
    audited(
        &state,
        &ctx,
        request_id,
        id,
        AbsenceAction::RequestChanges,
        |wf| async move { wf.request_changes(&ctx, id, changes).await },
    )
    .await
}

pub async fn cancel_absence_request(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    CurrentRequestId(request_id): CurrentRequestId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AbsenceRequest>> {
    audited(&state, &ctx, request_id, id, AbsenceAction::Cancel, |wf| async move {
        wf.cancel(&ctx, id).await
    })
    .await
}

/// Amends a change-requested request and returns it to review.
pub async fn resubmit_absence_request(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    CurrentRequestId(request_id): CurrentRequestId,
    Path(id): Path<Uuid>,
    Json(input): Json<AbsenceRequestInput>,
) -> ApiResult<Json<AbsenceRequestWithWarnings>> {
    let workflow = workflow(&state);
    let before = workflow.get(&ctx, id).await?;
    let request = workflow.resubmit(&ctx, id, &input).await?;
    let changes = before.fields().diff(&request.fields());
    let overlap_warnings = workflow.overlaps_for(&ctx, &request).await?;

    AuditLogRepository::new(state.pool.clone()).insert_async(
        audit_helpers::absence_resubmitted(ctx.user_id, &before, &request, &changes)
            .with_request_id(request_id)
            .build(),
    );
    record_absence_transition(AbsenceAction::Resubmit.as_str());

    Ok(Json(AbsenceRequestWithWarnings {
        request,
        overlap_warnings,
    }))
}
