//! Audit log repository.

use domain::models::audit_log::{AuditLog, CreateAuditLogInput, ListAuditLogsQuery};
use shared::pagination::PageRequest;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::AuditLogEntity;
use crate::metrics::QueryTimer;

const AUDIT_COLUMNS: &str = "id, company_id, timestamp, actor_id, actor_type, action, \
                             resource_type, resource_id, changes, request_id";

/// WHERE clause for the optional list filters, numbering parameters after `$1`.
struct AuditLogFilter {
    conditions: Vec<String>,
    param_count: usize,
}

impl AuditLogFilter {
    fn build(query: &ListAuditLogsQuery) -> Self {
        let mut filter = Self {
            conditions: vec!["company_id = $1".to_string()],
            param_count: 1,
        };
        filter.push_if(query.actor_id.is_some(), "actor_id =");
        filter.push_if(query.action.is_some(), "action =");
        filter.push_if(query.resource_type.is_some(), "resource_type =");
        filter.push_if(query.resource_id.is_some(), "resource_id =");
        filter.push_if(query.from.is_some(), "timestamp >=");
        filter.push_if(query.to.is_some(), "timestamp <=");
        filter
    }

    fn push_if(&mut self, present: bool, condition: &str) {
        if present {
            self.param_count += 1;
            self.conditions
                .push(format!("{} ${}", condition, self.param_count));
        }
    }

    fn where_clause(&self) -> String {
        self.conditions.join(" AND ")
    }
}

/// Binds the optional filters in the order [`AuditLogFilter::build`] numbers them.
macro_rules! bind_query_filters {
    ($builder:expr, $query:expr) => {{
        let mut b = $builder;
        if let Some(ref actor_id) = $query.actor_id {
            b = b.bind(actor_id);
        }
        if let Some(ref action) = $query.action {
            b = b.bind(action);
        }
        if let Some(ref resource_type) = $query.resource_type {
            b = b.bind(resource_type);
        }
        if let Some(ref resource_id) = $query.resource_id {
            b = b.bind(resource_id);
        }
        if let Some(ref from) = $query.from {
            b = b.bind(from);
        }
        if let Some(ref to) = $query.to {
            b = b.bind(to);
        }
        b
    }};
}

/// Repository for audit log entries.
#[derive(Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, input: CreateAuditLogInput) -> Result<AuditLog, sqlx::Error> {
        let changes = input
            .changes
            .as_ref()
            .and_then(|changes| serde_json::to_value(changes).ok());

        let timer = QueryTimer::new("insert_audit_log");
        let result = sqlx::query_as::<_, AuditLogEntity>(&format!(
            r#"
            INSERT INTO audit_logs (
                company_id, actor_id, actor_type, action, resource_type, resource_id,
                changes, request_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            AUDIT_COLUMNS
        ))
        .bind(input.company_id)
        .bind(input.actor_id)
        .bind(input.actor_type.as_str())
        .bind(input.action.as_str())
        .bind(&input.resource_type)
        .bind(&input.resource_id)
        .bind(changes)
        .bind(&input.request_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(Into::into)
    }

    /// Inserts in the background; failures are logged and dropped.
    pub fn insert_async(&self, input: CreateAuditLogInput) {
        let repo = self.clone();
        tokio::spawn(async move {
            let action = input.action;
            if let Err(e) = repo.insert(input).await {
                tracing::error!(action = %action, error = %e, "Failed to insert audit log");
            }
        });
    }

    /// Newest first, with the total count of matching entries.
    pub async fn list(
        &self,
        company_id: Uuid,
        query: &ListAuditLogsQuery,
    ) -> Result<(Vec<AuditLog>, i64), sqlx::Error> {
        let page = PageRequest::new(query.page, query.per_page);
        let filter = AuditLogFilter::build(query);
        let where_clause = filter.where_clause();

        let timer = QueryTimer::new("count_audit_logs");
        let count_sql = format!("SELECT COUNT(*) FROM audit_logs WHERE {}", where_clause);
        let count_builder = sqlx::query_scalar::<_, i64>(&count_sql).bind(company_id);
        let total = bind_query_filters!(count_builder, query)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        let total = total?;

        let timer = QueryTimer::new("list_audit_logs");
        let list_sql = format!(
            r#"
            SELECT {}
            FROM audit_logs
            WHERE {}
            ORDER BY timestamp DESC, id
            LIMIT ${} OFFSET ${}
            "#,
            AUDIT_COLUMNS,
            where_clause,
            filter.param_count + 1,
            filter.param_count + 2
        );
        let list_builder = sqlx::query_as::<_, AuditLogEntity>(&list_sql).bind(company_id);
        let rows = bind_query_filters!(list_builder, query)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await;
        timer.record();

        Ok((rows?.into_iter().map(Into::into).collect(), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_numbers_parameters_in_bind_order() {
        let query = ListAuditLogsQuery {
            action: Some("absence.approve".to_string()),
            resource_id: Some("abc".to_string()),
            ..Default::default()
        };
        let filter = AuditLogFilter::build(&query);
        assert_eq!(
            filter.where_clause(),
            "company_id = $1 AND action = $2 AND resource_id = $3"
        );
        assert_eq!(filter.param_count, 3);
    }

    #[test]
    fn test_filter_without_options() {
        let filter = AuditLogFilter::build(&ListAuditLogsQuery::default());
        assert_eq!(filter.where_clause(), "company_id = $1");
        assert_eq!(filter.param_count, 1);
    }
}
