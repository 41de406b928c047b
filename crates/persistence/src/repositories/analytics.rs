//! Read-side queries for cost analytics and site ownership checks.

use async_trait::async_trait;
use domain::error::DomainResult;
use domain::models::analytics::{AttendanceCostRow, DateRange, MaterialCostRow};
use domain::models::ConstructionSite;
use domain::services::cost_analytics::CostDataSource;
use domain::services::site_access::SiteDirectory;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{AttendanceCostEntity, ConstructionSiteEntity, MaterialCostEntity};
use crate::metrics::QueryTimer;

const SITE_COLUMNS: &str =
    "id, company_id, name, address, status, contract_value, deleted_at, created_at";

/// Repository backing the cost aggregator.
#[derive(Clone)]
pub struct CostAnalyticsRepository {
    pool: PgPool,
}

impl CostAnalyticsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CostDataSource for CostAnalyticsRepository {
    async fn find_site(
        &self,
        company_id: Uuid,
        site_id: Uuid,
    ) -> DomainResult<Option<ConstructionSite>> {
        let timer = QueryTimer::new("find_construction_site");
        let result = sqlx::query_as::<_, ConstructionSiteEntity>(&format!(
            r#"
            SELECT {}
            FROM construction_sites
            WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL
            "#,
            SITE_COLUMNS
        ))
        .bind(site_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    async fn list_sites(&self, company_id: Uuid) -> DomainResult<Vec<ConstructionSite>> {
        let timer = QueryTimer::new("list_construction_sites");
        let result = sqlx::query_as::<_, ConstructionSiteEntity>(&format!(
            r#"
            SELECT {}
            FROM construction_sites
            WHERE company_id = $1 AND deleted_at IS NULL
            ORDER BY name ASC, id
            "#,
            SITE_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn attendance_rows(
        &self,
        company_id: Uuid,
        site_ids: &[Uuid],
        range: DateRange,
    ) -> DomainResult<Vec<AttendanceCostRow>> {
        let timer = QueryTimer::new("attendance_cost_rows");
        let result = sqlx::query_as::<_, AttendanceCostEntity>(
            r#"
            SELECT a.site_id, a.user_id, a.clock_in_time, a.clock_out_time, a.total_hours,
                   a.hourly_cost, u.hourly_cost AS user_hourly_cost
            FROM attendances a
            JOIN users u ON u.id = a.user_id
            WHERE a.company_id = $1
              AND a.site_id = ANY($2)
              AND ($3::date IS NULL OR (a.clock_in_time AT TIME ZONE 'UTC')::date >= $3)
              AND ($4::date IS NULL OR (a.clock_in_time AT TIME ZONE 'UTC')::date <= $4)
            "#,
        )
        .bind(company_id)
        .bind(site_ids)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn material_rows(
        &self,
        company_id: Uuid,
        site_ids: &[Uuid],
        range: DateRange,
    ) -> DomainResult<Vec<MaterialCostRow>> {
        let timer = QueryTimer::new("material_cost_rows");
        let result = sqlx::query_as::<_, MaterialCostEntity>(
            r#"
            SELECT m.site_id, m.state, m.numero_confezioni, c.unit_price
            FROM material_usages m
            LEFT JOIN material_catalog c ON c.id = m.catalog_id
            WHERE m.company_id = $1
              AND m.site_id = ANY($2)
              AND ($3::date IS NULL OR m.usage_date >= $3)
              AND ($4::date IS NULL OR m.usage_date <= $4)
            "#,
        )
        .bind(company_id)
        .bind(site_ids)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl SiteDirectory for CostAnalyticsRepository {
    async fn site_belongs_to(&self, site_id: Uuid, company_id: Uuid) -> DomainResult<bool> {
        let timer = QueryTimer::new("site_belongs_to_company");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM construction_sites
                WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL
            )
            "#,
        )
        .bind(site_id)
        .bind(company_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?)
    }
}
