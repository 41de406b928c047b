//! Absence request repository.
//!
//! Status changes are compare-and-set on the current status so that two
//! concurrent decisions cannot both succeed.

use async_trait::async_trait;
use domain::error::{DomainError, DomainResult};
use domain::models::absence_request::{
    AbsenceListFilter, AbsenceRequest, AbsenceRequestRevision, ResolvedAbsenceFields,
};
use domain::services::absence_workflow::{
    AbsenceRequestStore, NewAbsenceRequest, OverlapQuery, Resubmission, StatusUpdate,
};
use shared::pagination::PageRequest;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::entities::{
    AbsenceCategoryDb, AbsenceRequestEntity, AbsenceRequestRevisionEntity, AbsenceStatusDb,
    AbsenceTypeDb, DayPartDb, PermessoModeDb, ABSENCE_REQUEST_COLUMNS,
};
use crate::metrics::QueryTimer;

/// Binds the user-editable fields in column order
/// (type, mode, category, is_104, start_date, end_date, day_part,
/// start_time, end_time, duration_minutes, notes, attachment_url).
macro_rules! bind_absence_fields {
    ($builder:expr, $fields:expr) => {{
        let f: &ResolvedAbsenceFields = $fields;
        $builder
            .bind(AbsenceTypeDb::from(f.absence_type))
            .bind(f.mode.map(PermessoModeDb::from))
            .bind(f.category.map(AbsenceCategoryDb::from))
            .bind(f.is_104)
            .bind(f.start_date)
            .bind(f.end_date)
            .bind(f.day_part.map(DayPartDb::from))
            .bind(f.start_time)
            .bind(f.end_time)
            .bind(f.duration_minutes)
            .bind(f.notes.clone())
            .bind(f.attachment_url.clone())
    }};
}

/// Repository for absence requests and their revisions.
#[derive(Clone)]
pub struct AbsenceRequestRepository {
    pool: PgPool,
}

impl AbsenceRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AbsenceRequestStore for AbsenceRequestRepository {
    async fn insert(&self, new: NewAbsenceRequest) -> DomainResult<AbsenceRequest> {
        let timer = QueryTimer::new("insert_absence_request");
        let sql = format!(
            r#"
            INSERT INTO absence_requests (
                employee_id, company_id,
                type, mode, category, is_104, start_date, end_date, day_part,
                start_time, end_time, duration_minutes, notes, attachment_url,
                status, revision_number
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, 'PENDING', 1)
            RETURNING {}
            "#,
            ABSENCE_REQUEST_COLUMNS
        );
        let builder = sqlx::query_as::<_, AbsenceRequestEntity>(&sql)
            .bind(new.employee_id)
            .bind(new.company_id);
        let result = bind_absence_fields!(builder, &new.fields)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        Ok(result?.into())
    }

    async fn find(
        &self,
        company_id: Uuid,
        id: Uuid,
        employee_id: Option<Uuid>,
    ) -> DomainResult<Option<AbsenceRequest>> {
        let timer = QueryTimer::new("find_absence_request");
        let sql = format!(
            r#"
            SELECT {}
            FROM absence_requests
            WHERE id = $1 AND company_id = $2
              AND ($3::uuid IS NULL OR employee_id = $3)
            "#,
            ABSENCE_REQUEST_COLUMNS
        );
        let result = sqlx::query_as::<_, AbsenceRequestEntity>(&sql)
            .bind(id)
            .bind(company_id)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    async fn list(
        &self,
        company_id: Uuid,
        filter: &AbsenceListFilter,
        page: PageRequest,
    ) -> DomainResult<(Vec<AbsenceRequest>, i64)> {
        const FILTER: &str = r#"
            company_id = $1
            AND ($2::uuid IS NULL OR employee_id = $2)
            AND ($3::absence_status IS NULL OR status = $3)
            AND ($4::absence_type IS NULL OR type = $4)
            AND ($5::date IS NULL OR COALESCE(end_date, start_date) >= $5)
            AND ($6::date IS NULL OR start_date <= $6)
        "#;
        let status = filter.status.map(AbsenceStatusDb::from);
        let absence_type = filter.absence_type.map(AbsenceTypeDb::from);

        let timer = QueryTimer::new("count_absence_requests");
        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM absence_requests WHERE {}",
            FILTER
        ))
        .bind(company_id)
        .bind(filter.employee_id)
        .bind(status)
        .bind(absence_type)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        let total = total?;

        let timer = QueryTimer::new("list_absence_requests");
        let sql = format!(
            r#"
            SELECT {}
            FROM absence_requests
            WHERE {}
            ORDER BY created_at DESC, id
            LIMIT $7 OFFSET $8
            "#,
            ABSENCE_REQUEST_COLUMNS, FILTER
        );
        let rows = sqlx::query_as::<_, AbsenceRequestEntity>(&sql)
            .bind(company_id)
            .bind(filter.employee_id)
            .bind(status)
            .bind(absence_type)
            .bind(filter.from)
            .bind(filter.to)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await;
        timer.record();

        Ok((rows?.into_iter().map(Into::into).collect(), total))
    }

    async fn apply_status(
        &self,
        company_id: Uuid,
        id: Uuid,
        update: StatusUpdate,
    ) -> DomainResult<Option<AbsenceRequest>> {
        let timer = QueryTimer::new("update_absence_request_status");
        let sql = format!(
            r#"
            UPDATE absence_requests
            SET status = $4,
                decision_by = CASE WHEN $5::boolean THEN $6::uuid ELSE decision_by END,
                decision_at = CASE WHEN $5::boolean THEN $7::timestamptz ELSE decision_at END,
                decision_note = CASE WHEN $5::boolean THEN $8::text ELSE decision_note END,
                requested_changes = $9,
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2 AND status = $3
            RETURNING {}
            "#,
            ABSENCE_REQUEST_COLUMNS
        );
        let decided = update.decision.is_some();
        let (by, at, note) = match update.decision {
            Some(d) => (Some(d.by), Some(d.at), d.note),
            None => (None, None, None),
        };
        let result = sqlx::query_as::<_, AbsenceRequestEntity>(&sql)
            .bind(id)
            .bind(company_id)
            .bind(AbsenceStatusDb::from(update.expected))
            .bind(AbsenceStatusDb::from(update.status))
            .bind(decided)
            .bind(by)
            .bind(at)
            .bind(note)
            .bind(update.requested_changes)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    async fn apply_resubmission(
        &self,
        company_id: Uuid,
        id: Uuid,
        resubmission: Resubmission,
    ) -> DomainResult<Option<AbsenceRequest>> {
        let changes = serde_json::to_value(&resubmission.changes)
            .map_err(|e| DomainError::Storage(format!("Cannot encode revision changes: {}", e)))?;

        let timer = QueryTimer::new("resubmit_absence_request");
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE absence_requests
            SET type = $4, mode = $5, category = $6, is_104 = $7,
                start_date = $8, end_date = $9, day_part = $10,
                start_time = $11, end_time = $12, duration_minutes = $13,
                notes = $14, attachment_url = $15,
                status = 'PENDING',
                requested_changes = NULL,
                decision_by = NULL,
                decision_at = NULL,
                decision_note = NULL,
                revision_number = revision_number + 1,
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
              AND status = 'CHANGES_REQUESTED' AND revision_number = $3
            RETURNING {}
            "#,
            ABSENCE_REQUEST_COLUMNS
        );
        let builder = sqlx::query_as::<_, AbsenceRequestEntity>(&sql)
            .bind(id)
            .bind(company_id)
            .bind(resubmission.expected_revision);
        let updated = bind_absence_fields!(builder, &resubmission.fields)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO absence_request_revisions
                (absence_request_id, revision_number, changed_by, changes)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(updated.id)
        .bind(updated.revision_number)
        .bind(resubmission.changed_by)
        .bind(changes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(updated.into()))
    }

    async fn revisions(
        &self,
        company_id: Uuid,
        id: Uuid,
    ) -> DomainResult<Vec<AbsenceRequestRevision>> {
        let timer = QueryTimer::new("list_absence_request_revisions");
        let result = sqlx::query_as::<_, AbsenceRequestRevisionEntity>(
            r#"
            SELECT r.id, r.absence_request_id, r.revision_number, r.changed_by,
                   r.changes, r.created_at
            FROM absence_request_revisions r
            JOIN absence_requests a ON a.id = r.absence_request_id
            WHERE r.absence_request_id = $1 AND a.company_id = $2
            ORDER BY r.revision_number ASC
            "#,
        )
        .bind(id)
        .bind(company_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result?
            .into_iter()
            .map(AbsenceRequestRevision::try_from)
            .collect()
    }

    async fn find_overlapping_approved(
        &self,
        query: &OverlapQuery,
    ) -> DomainResult<Vec<AbsenceRequest>> {
        let timer = QueryTimer::new("find_overlapping_absences");
        let sql = format!(
            r#"
            SELECT {}
            FROM absence_requests
            WHERE company_id = $1 AND employee_id = $2 AND status = 'APPROVED'
              AND start_date <= $4
              AND COALESCE(end_date, start_date) >= $3
              AND ($5::uuid IS NULL OR id <> $5)
            ORDER BY start_date ASC
            LIMIT $6
            "#,
            ABSENCE_REQUEST_COLUMNS
        );
        let result = sqlx::query_as::<_, AbsenceRequestEntity>(&sql)
            .bind(query.company_id)
            .bind(query.employee_id)
            .bind(query.start_date)
            .bind(query.end_date)
            .bind(query.exclude_id)
            .bind(query.limit)
            .fetch_all(&self.pool)
            .await;
        timer.record();

        let rows = result?;
        if rows.len() as i64 == query.limit {
            debug!(
                company_id = %query.company_id,
                employee_id = %query.employee_id,
                limit = query.limit,
                "Overlap check hit its result limit"
            );
        }
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
