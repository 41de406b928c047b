//! Audit entries for absence and attendance events.
//!
//! Entries are built here and persisted fire-and-forget by the repository,
//! so a failing audit write never fails the request that caused it.

use crate::models::absence_request::{AbsenceRequest, FieldSnapshot};
use crate::models::attendance::{Attendance, RecalculationSummary};
use crate::models::audit_log::FieldChanges;
use crate::models::{ActorType, AuditAction, CreateAuditLogInput, FieldChange};
use crate::services::absence_workflow::AbsenceAction;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Fluent builder for [`CreateAuditLogInput`].
#[derive(Debug, Clone)]
pub struct AuditLogBuilder {
    company_id: Uuid,
    actor_id: Option<Uuid>,
    actor_type: ActorType,
    action: AuditAction,
    resource_type: String,
    resource_id: Option<String>,
    changes: Option<FieldChanges>,
    request_id: Option<String>,
}

impl AuditLogBuilder {
    fn new(company_id: Uuid, actor_id: Option<Uuid>, actor_type: ActorType, action: AuditAction) -> Self {
        Self {
            company_id,
            actor_id,
            actor_type,
            action,
            resource_type: String::new(),
            resource_id: None,
            changes: None,
            request_id: None,
        }
    }

    pub fn user_action(company_id: Uuid, user_id: Uuid, action: AuditAction) -> Self {
        Self::new(company_id, Some(user_id), ActorType::User, action)
    }

    pub fn system_action(company_id: Uuid, action: AuditAction) -> Self {
        Self::new(company_id, None, ActorType::System, action)
    }

    pub fn on_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = resource_type.into();
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Resource type only, for actions spanning many rows.
    pub fn on_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = resource_type.into();
        self
    }

    pub fn with_json_change(
        mut self,
        field: impl Into<String>,
        old: Option<JsonValue>,
        new: Option<JsonValue>,
    ) -> Self {
        self.changes
            .get_or_insert_with(FieldChanges::new)
            .insert(field.into(), FieldChange::new(old, new));
        self
    }

    pub fn with_change(
        self,
        field: impl Into<String>,
        old: Option<String>,
        new: Option<String>,
    ) -> Self {
        self.with_json_change(field, old.map(JsonValue::from), new.map(JsonValue::from))
    }

    /// Merges revision snapshots; null snapshots become absent values.
    pub fn with_snapshots(mut self, snapshots: &BTreeMap<String, FieldSnapshot>) -> Self {
        let present = |v: &JsonValue| (!v.is_null()).then(|| v.clone());
        let changes = self.changes.get_or_insert_with(FieldChanges::new);
        for (field, snapshot) in snapshots {
            changes.insert(
                field.clone(),
                FieldChange::new(present(&snapshot.before), present(&snapshot.after)),
            );
        }
        self
    }

    pub fn with_request_id(mut self, id: Option<impl Into<String>>) -> Self {
        self.request_id = id.map(Into::into);
        self
    }

    pub fn build(self) -> CreateAuditLogInput {
        CreateAuditLogInput {
            company_id: self.company_id,
            actor_id: self.actor_id,
            actor_type: self.actor_type,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            changes: self.changes.filter(|c| !c.is_empty()),
            request_id: self.request_id,
        }
    }
}

/// Audit entries for the common events.
pub mod audit_helpers {
    use super::*;

    pub const ABSENCE_RESOURCE: &str = "absence_request";
    pub const ATTENDANCE_RESOURCE: &str = "attendance";

    fn absence_action(action: AbsenceAction) -> AuditAction {
        match action {
            AbsenceAction::Approve => AuditAction::AbsenceApprove,
            AbsenceAction::Reject => AuditAction::AbsenceReject,
            AbsenceAction::RequestChanges => AuditAction::AbsenceRequestChanges,
            AbsenceAction::Cancel => AuditAction::AbsenceCancel,
            AbsenceAction::Resubmit => AuditAction::AbsenceResubmit,
        }
    }

    pub fn absence_created(actor_id: Uuid, request: &AbsenceRequest) -> AuditLogBuilder {
        AuditLogBuilder::user_action(request.company_id, actor_id, AuditAction::AbsenceCreate)
            .on_resource(ABSENCE_RESOURCE, request.id.to_string())
            .with_json_change("status", None, Some(json!(request.status)))
            .with_json_change("type", None, Some(json!(request.absence_type)))
    }

    /// Status transition with the decision text, when one was given.
    pub fn absence_transitioned(
        actor_id: Uuid,
        action: AbsenceAction,
        before: &AbsenceRequest,
        after: &AbsenceRequest,
    ) -> AuditLogBuilder {
        let mut builder =
            AuditLogBuilder::user_action(after.company_id, actor_id, absence_action(action))
                .on_resource(ABSENCE_RESOURCE, after.id.to_string())
                .with_json_change(
                    "status",
                    Some(json!(before.status)),
                    Some(json!(after.status)),
                );
        if after.decision_note.is_some() && after.decision_note != before.decision_note {
            builder = builder.with_change(
                "decisionNote",
                before.decision_note.clone(),
                after.decision_note.clone(),
            );
        }
        if let Some(changes) = &after.requested_changes {
            builder = builder.with_change("requestedChanges", None, Some(changes.clone()));
        }
        builder
    }

    pub fn absence_resubmitted(
        actor_id: Uuid,
        before: &AbsenceRequest,
        after: &AbsenceRequest,
        changes: &BTreeMap<String, FieldSnapshot>,
    ) -> AuditLogBuilder {
        absence_transitioned(actor_id, AbsenceAction::Resubmit, before, after)
            .with_json_change(
                "revisionNumber",
                Some(json!(before.revision_number)),
                Some(json!(after.revision_number)),
            )
            .with_snapshots(changes)
    }

    pub fn clock_in(attendance: &Attendance) -> AuditLogBuilder {
        AuditLogBuilder::user_action(
            attendance.company_id,
            attendance.user_id,
            AuditAction::AttendanceClockIn,
        )
        .on_resource(ATTENDANCE_RESOURCE, attendance.id.to_string())
        .with_json_change("siteId", None, Some(json!(attendance.site_id)))
    }

    pub fn clock_out(attendance: &Attendance) -> AuditLogBuilder {
        AuditLogBuilder::user_action(
            attendance.company_id,
            attendance.user_id,
            AuditAction::AttendanceClockOut,
        )
        .on_resource(ATTENDANCE_RESOURCE, attendance.id.to_string())
        .with_json_change("totalHours", None, Some(json!(attendance.total_hours)))
        .with_json_change(
            "lunchBreakApplied",
            None,
            Some(json!(attendance.lunch_break_applied)),
        )
    }

    /// Bulk recalculation triggered by an owner.
    pub fn recalculated(
        company_id: Uuid,
        actor_id: Uuid,
        summary: &RecalculationSummary,
    ) -> AuditLogBuilder {
        AuditLogBuilder::user_action(company_id, actor_id, AuditAction::AttendanceRecalculate)
            .on_resource_type(ATTENDANCE_RESOURCE)
            .with_json_change("examined", None, Some(json!(summary.examined)))
            .with_json_change("updated", None, Some(json!(summary.updated)))
    }
}
