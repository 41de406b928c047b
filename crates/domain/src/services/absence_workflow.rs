//! Absence request workflow.
//!
//! ```text
//! PENDING ──approve──────────▶ APPROVED
//! PENDING ──reject───────────▶ REJECTED
//! PENDING ──request_changes──▶ CHANGES_REQUESTED ──resubmit──▶ PENDING
//! PENDING ──cancel───────────▶ CANCELLED ◀──cancel── CHANGES_REQUESTED
//! ```
//!
//! Checks run in a fixed order: visibility (`NotFound`), entitlement
//! (`Forbidden`), transition legality (`InvalidState`), then payload
//! validation. Status writes are compare-and-set in the store, so a
//! concurrent decision that lost the race surfaces as `InvalidState`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use shared::pagination::PageRequest;
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::absence_request::{
    AbsenceListFilter, AbsenceRequest, AbsenceRequestInput, AbsenceRequestRevision,
    AbsenceStatus, FieldSnapshot, OverlapWarning, ResolvedAbsenceFields,
};
use crate::models::AuthContext;

/// Default number of overlapping requests returned by the overlap check.
pub const DEFAULT_OVERLAP_LIMIT: i64 = 5;

/// Workflow operations that move a request between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbsenceAction {
    Approve,
    Reject,
    RequestChanges,
    Cancel,
    Resubmit,
}

impl AbsenceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbsenceAction::Approve => "approve",
            AbsenceAction::Reject => "reject",
            AbsenceAction::RequestChanges => "request_changes",
            AbsenceAction::Cancel => "cancel",
            AbsenceAction::Resubmit => "resubmit",
        }
    }

    /// Who may perform the action.
    pub fn performer(&self) -> Performer {
        match self {
            AbsenceAction::Approve | AbsenceAction::Reject | AbsenceAction::RequestChanges => {
                Performer::CompanyOwner
            }
            AbsenceAction::Cancel | AbsenceAction::Resubmit => Performer::Requester,
        }
    }
}

impl std::fmt::Display for AbsenceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actor entitled to perform an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Performer {
    /// Any user with the owner role in the request's company.
    CompanyOwner,
    /// The employee who filed the request.
    Requester,
}

/// Legal transitions as (from, action, to).
pub const TRANSITIONS: &[(AbsenceStatus, AbsenceAction, AbsenceStatus)] = &[
    (AbsenceStatus::Pending, AbsenceAction::Approve, AbsenceStatus::Approved),
    (AbsenceStatus::Pending, AbsenceAction::Reject, AbsenceStatus::Rejected),
    (AbsenceStatus::Pending, AbsenceAction::RequestChanges, AbsenceStatus::ChangesRequested),
    (AbsenceStatus::Pending, AbsenceAction::Cancel, AbsenceStatus::Cancelled),
    (AbsenceStatus::ChangesRequested, AbsenceAction::Resubmit, AbsenceStatus::Pending),
    (AbsenceStatus::ChangesRequested, AbsenceAction::Cancel, AbsenceStatus::Cancelled),
];

/// Target status of `action` from `from`, if the transition is legal.
pub fn next_status(from: AbsenceStatus, action: AbsenceAction) -> Option<AbsenceStatus> {
    TRANSITIONS
        .iter()
        .find(|(f, a, _)| *f == from && *a == action)
        .map(|(_, _, to)| *to)
}

/// Closed-interval overlap: `[a, b]` and `[c, d]` overlap iff `a <= d && c <= b`.
pub fn intervals_overlap(a: NaiveDate, b: NaiveDate, c: NaiveDate, d: NaiveDate) -> bool {
    a <= d && c <= b
}

/// A new request as handed to the store.
#[derive(Debug, Clone)]
pub struct NewAbsenceRequest {
    pub employee_id: Uuid,
    pub company_id: Uuid,
    pub fields: ResolvedAbsenceFields,
}

/// Owner decision stamped on the request.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub by: Uuid,
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

/// Status change applied with compare-and-set on the current status.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub expected: AbsenceStatus,
    pub status: AbsenceStatus,
    /// Replaces the stored decision when set; otherwise it is left untouched.
    pub decision: Option<Decision>,
    /// Always written; `None` clears the previous change request.
    pub requested_changes: Option<String>,
}

/// Resubmission applied atomically with its revision record.
#[derive(Debug, Clone)]
pub struct Resubmission {
    pub expected_revision: i32,
    pub fields: ResolvedAbsenceFields,
    pub changed_by: Uuid,
    pub changes: BTreeMap<String, FieldSnapshot>,
}

/// Candidate interval for the overlap check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapQuery {
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub exclude_id: Option<Uuid>,
    pub limit: i64,
}

/// Persistence required by the workflow.
#[async_trait]
pub trait AbsenceRequestStore: Send + Sync {
    /// Stores a new request with status PENDING and revision 1.
    async fn insert(&self, new: NewAbsenceRequest) -> DomainResult<AbsenceRequest>;

    /// Finds a request of the company, optionally restricted to one employee.
    async fn find(
        &self,
        company_id: Uuid,
        id: Uuid,
        employee_id: Option<Uuid>,
    ) -> DomainResult<Option<AbsenceRequest>>;

    /// Lists requests of the company, newest first, with the total count.
    async fn list(
        &self,
        company_id: Uuid,
        filter: &AbsenceListFilter,
        page: PageRequest,
    ) -> DomainResult<(Vec<AbsenceRequest>, i64)>;

    /// Applies `update` only if the stored status still equals
    /// `update.expected`. Returns `None` when it no longer does.
    async fn apply_status(
        &self,
        company_id: Uuid,
        id: Uuid,
        update: StatusUpdate,
    ) -> DomainResult<Option<AbsenceRequest>>;

    /// Replaces the fields, bumps the revision, clears the change request,
    /// sets PENDING and appends one revision record, all in one transaction.
    /// Returns `None` when the request is no longer in CHANGES_REQUESTED at
    /// `expected_revision`.
    async fn apply_resubmission(
        &self,
        company_id: Uuid,
        id: Uuid,
        resubmission: Resubmission,
    ) -> DomainResult<Option<AbsenceRequest>>;

    /// Revision history, oldest first.
    async fn revisions(
        &self,
        company_id: Uuid,
        id: Uuid,
    ) -> DomainResult<Vec<AbsenceRequestRevision>>;

    /// APPROVED requests of the employee intersecting the query interval.
    async fn find_overlapping_approved(
        &self,
        query: &OverlapQuery,
    ) -> DomainResult<Vec<AbsenceRequest>>;
}

/// Absence request workflow over an [`AbsenceRequestStore`].
pub struct AbsenceWorkflow<S> {
    store: S,
    overlap_limit: i64,
}

impl<S: AbsenceRequestStore> AbsenceWorkflow<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            overlap_limit: DEFAULT_OVERLAP_LIMIT,
        }
    }

    pub fn with_overlap_limit(mut self, limit: i64) -> Self {
        self.overlap_limit = limit.max(1);
        self
    }

    /// Workers only see their own requests.
    fn visibility(actor: &AuthContext) -> Option<Uuid> {
        if actor.is_owner() {
            None
        } else {
            Some(actor.user_id)
        }
    }

    async fn load(&self, actor: &AuthContext, id: Uuid) -> DomainResult<AbsenceRequest> {
        self.store
            .find(actor.company_id, id, Self::visibility(actor))
            .await?
            .ok_or_else(|| DomainError::NotFound("Absence request not found".to_string()))
    }

    fn authorize(
        actor: &AuthContext,
        request: &AbsenceRequest,
        action: AbsenceAction,
    ) -> DomainResult<()> {
        let allowed = match action.performer() {
            Performer::CompanyOwner => actor.is_owner(),
            Performer::Requester => request.employee_id == actor.user_id,
        };
        if allowed {
            Ok(())
        } else {
            Err(DomainError::Forbidden(format!(
                "Not allowed to {} this absence request",
                action
            )))
        }
    }

    fn transition(request: &AbsenceRequest, action: AbsenceAction) -> DomainResult<AbsenceStatus> {
        next_status(request.status, action).ok_or_else(|| {
            DomainError::InvalidState(format!(
                "Cannot {} a request in status {}",
                action, request.status
            ))
        })
    }

    fn lost_race(action: AbsenceAction) -> DomainError {
        DomainError::InvalidState(format!(
            "Absence request changed concurrently; {} was not applied",
            action
        ))
    }

    /// Files a new request for the calling employee.
    pub async fn create(
        &self,
        actor: &AuthContext,
        input: &AbsenceRequestInput,
    ) -> DomainResult<AbsenceRequest> {
        let fields = input.resolve()?;
        let request = self
            .store
            .insert(NewAbsenceRequest {
                employee_id: actor.user_id,
                company_id: actor.company_id,
                fields,
            })
            .await?;

        info!(
            company_id = %actor.company_id,
            request_id = %request.id,
            actor_id = %actor.user_id,
            absence_type = %request.absence_type,
            "Absence request created"
        );
        Ok(request)
    }

    /// Single request visible to the actor.
    pub async fn get(&self, actor: &AuthContext, id: Uuid) -> DomainResult<AbsenceRequest> {
        self.load(actor, id).await
    }

    /// Page of requests. Workers are always restricted to their own rows.
    pub async fn list(
        &self,
        actor: &AuthContext,
        filter: AbsenceListFilter,
        page: PageRequest,
    ) -> DomainResult<(Vec<AbsenceRequest>, i64)> {
        let filter = match Self::visibility(actor) {
            Some(own) => AbsenceListFilter {
                employee_id: Some(own),
                ..filter
            },
            None => filter,
        };
        debug!(company_id = %actor.company_id, ?filter, "Listing absence requests");
        self.store.list(actor.company_id, &filter, page).await
    }

    /// Revision history of a request visible to the actor.
    pub async fn revisions(
        &self,
        actor: &AuthContext,
        id: Uuid,
    ) -> DomainResult<Vec<AbsenceRequestRevision>> {
        let request = self.load(actor, id).await?;
        self.store.revisions(actor.company_id, request.id).await
    }

    async fn decide(
        &self,
        actor: &AuthContext,
        id: Uuid,
        action: AbsenceAction,
        note: Option<String>,
        requested_changes: Option<String>,
    ) -> DomainResult<AbsenceRequest> {
        let request = self.load(actor, id).await?;
        Self::authorize(actor, &request, action)?;
        let status = Self::transition(&request, action)?;

        match action {
            AbsenceAction::Reject if note.as_deref().map_or(true, |n| n.trim().is_empty()) => {
                return Err(DomainError::invalid_field(
                    "note",
                    "required",
                    "A note is required to reject a request",
                ));
            }
            AbsenceAction::RequestChanges
                if requested_changes
                    .as_deref()
                    .map_or(true, |c| c.trim().is_empty()) =>
            {
                return Err(DomainError::invalid_field(
                    "requestedChanges",
                    "required",
                    "Describe the changes you need",
                ));
            }
            _ => {}
        }

        let decision = match action.performer() {
            Performer::CompanyOwner => Some(Decision {
                by: actor.user_id,
                at: Utc::now(),
                note,
            }),
            Performer::Requester => None,
        };

        let updated = self
            .store
            .apply_status(
                actor.company_id,
                request.id,
                StatusUpdate {
                    expected: request.status,
                    status,
                    decision,
                    requested_changes,
                },
            )
            .await?
            .ok_or_else(|| Self::lost_race(action))?;

        info!(
            company_id = %actor.company_id,
            request_id = %updated.id,
            actor_id = %actor.user_id,
            action = %action,
            from = %request.status,
            to = %updated.status,
            "Absence request transitioned"
        );
        Ok(updated)
    }

    /// Owner approves a pending request.
    pub async fn approve(
        &self,
        actor: &AuthContext,
        id: Uuid,
        note: Option<String>,
    ) -> DomainResult<AbsenceRequest> {
        self.decide(actor, id, AbsenceAction::Approve, note, None).await
    }

    /// Owner rejects a pending request. A note is required.
    pub async fn reject(
        &self,
        actor: &AuthContext,
        id: Uuid,
        note: Option<String>,
    ) -> DomainResult<AbsenceRequest> {
        self.decide(actor, id, AbsenceAction::Reject, note, None).await
    }

    /// Owner sends a pending request back to the employee.
    pub async fn request_changes(
        &self,
        actor: &AuthContext,
        id: Uuid,
        changes: String,
    ) -> DomainResult<AbsenceRequest> {
        self.decide(actor, id, AbsenceAction::RequestChanges, None, Some(changes))
            .await
    }

    /// Requester withdraws a pending or change-requested request.
    pub async fn cancel(&self, actor: &AuthContext, id: Uuid) -> DomainResult<AbsenceRequest> {
        self.decide(actor, id, AbsenceAction::Cancel, None, None).await
    }

    /// Requester amends a change-requested request and sends it back to PENDING.
    pub async fn resubmit(
        &self,
        actor: &AuthContext,
        id: Uuid,
        input: &AbsenceRequestInput,
    ) -> DomainResult<AbsenceRequest> {
        let action = AbsenceAction::Resubmit;
        let request = self.load(actor, id).await?;
        Self::authorize(actor, &request, action)?;
        Self::transition(&request, action)?;

        let fields = input.resolve()?;
        let changes = request.fields().diff(&fields);

        let updated = self
            .store
            .apply_resubmission(
                actor.company_id,
                request.id,
                Resubmission {
                    expected_revision: request.revision_number,
                    fields,
                    changed_by: actor.user_id,
                    changes,
                },
            )
            .await?
            .ok_or_else(|| Self::lost_race(action))?;

        info!(
            company_id = %actor.company_id,
            request_id = %updated.id,
            actor_id = %actor.user_id,
            revision = updated.revision_number,
            "Absence request resubmitted"
        );
        Ok(updated)
    }

    /// Approved requests of `employee_id` intersecting `[start_date, end_date]`.
    ///
    /// Advisory only. A missing end date is treated as a single day. Workers
    /// may only check their own calendar.
    pub async fn check_overlaps(
        &self,
        actor: &AuthContext,
        employee_id: Uuid,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        exclude_id: Option<Uuid>,
    ) -> DomainResult<Vec<OverlapWarning>> {
        if !actor.is_owner() && employee_id != actor.user_id {
            return Err(DomainError::Forbidden(
                "Workers can only check their own absences".to_string(),
            ));
        }

        let query = OverlapQuery {
            company_id: actor.company_id,
            employee_id,
            start_date,
            end_date: end_date.unwrap_or(start_date).max(start_date),
            exclude_id,
            limit: self.overlap_limit,
        };
        let overlaps = self.store.find_overlapping_approved(&query).await?;
        Ok(overlaps.iter().map(OverlapWarning::from).collect())
    }

    /// Overlap warnings for a stored request, excluding itself.
    pub async fn overlaps_for(
        &self,
        actor: &AuthContext,
        request: &AbsenceRequest,
    ) -> DomainResult<Vec<OverlapWarning>> {
        self.check_overlaps(
            actor,
            request.employee_id,
            request.start_date,
            request.end_date,
            Some(request.id),
        )
        .await
    }
}
