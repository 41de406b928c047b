//! Audit log entity.

use chrono::{DateTime, Utc};
use domain::models::audit_log::{AuditActor, AuditLog, AuditResource};
use domain::models::ActorType;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the audit_logs table.
#[derive(Debug, Clone, FromRow)]
pub struct AuditLogEntity {
    pub id: Uuid,
    pub company_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor_id: Option<Uuid>,
    /// `user` or `system`.
    pub actor_type: String,
    /// `resource.operation`
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub changes: Option<serde_json::Value>,
    pub request_id: Option<String>,
}

impl From<AuditLogEntity> for AuditLog {
    fn from(e: AuditLogEntity) -> Self {
        Self {
            id: e.id,
            company_id: e.company_id,
            timestamp: e.timestamp,
            actor: AuditActor {
                id: e.actor_id,
                actor_type: e.actor_type.parse().unwrap_or(ActorType::System),
            },
            action: e.action,
            resource: AuditResource {
                resource_type: e.resource_type,
                id: e.resource_id,
            },
            changes: e.changes.and_then(|json| serde_json::from_value(json).ok()),
            request_id: e.request_id,
        }
    }
}
