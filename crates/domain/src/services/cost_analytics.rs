//! Site and company cost/margin aggregation.
//!
//! Labor comes from attendance (completed shifts plus a live projection for
//! open ones), materials from catalogued usage rows. Missing optional data
//! (contract value, hourly cost, unit price) contributes zero or null and never
//! fails the aggregation. Only a missing or foreign site is an error.
//!
//! Values are kept unrounded while aggregating and rounded to two decimals
//! when the report is built.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::analytics::{
    AttendanceCostRow, CompanyCostDashboard, DateRange, MaterialCostRow, SiteCostReport,
};
use crate::models::{AuthContext, ConstructionSite, MaterialUsageState};

use super::margin::{classify_insight, classify_margin};
use super::work_hours::{calculate_worked_hours, live_hours, round2};

/// Read access to the records the aggregator needs.
///
/// Every method is scoped to `company_id`; implementations must never return
/// rows of another tenant.
#[async_trait]
pub trait CostDataSource: Send + Sync {
    /// Non-deleted site of the company, if any.
    async fn find_site(
        &self,
        company_id: Uuid,
        site_id: Uuid,
    ) -> DomainResult<Option<ConstructionSite>>;

    /// Every non-deleted site of the company.
    async fn list_sites(&self, company_id: Uuid) -> DomainResult<Vec<ConstructionSite>>;

    /// Attendances of the given sites whose clock-in date falls in `range`.
    async fn attendance_rows(
        &self,
        company_id: Uuid,
        site_ids: &[Uuid],
        range: DateRange,
    ) -> DomainResult<Vec<AttendanceCostRow>>;

    /// Material usages of the given sites whose usage date falls in `range`.
    async fn material_rows(
        &self,
        company_id: Uuid,
        site_ids: &[Uuid],
        range: DateRange,
    ) -> DomainResult<Vec<MaterialCostRow>>;
}

/// Unrounded running totals for one site or the whole company.
#[derive(Debug, Clone, Default)]
pub struct CostTotals {
    pub labor: Decimal,
    pub materials: Decimal,
    pub completed_hours: Decimal,
    pub live_hours: Decimal,
    pub active_workers: HashSet<Uuid>,
    pub has_live_data: bool,
}

impl CostTotals {
    /// Adds one attendance, projecting open shifts up to `now`.
    pub fn add_attendance(&mut self, row: &AttendanceCostRow, now: DateTime<Utc>) {
        let cost = row.effective_hourly_cost();
        match row.clock_out {
            None => {
                let hours = live_hours(row.clock_in, now);
                self.live_hours += hours;
                self.labor += hours * cost;
                self.active_workers.insert(row.user_id);
                self.has_live_data = true;
            }
            Some(clock_out) => {
                let hours = row
                    .total_hours
                    .unwrap_or_else(|| calculate_worked_hours(row.clock_in, clock_out).worked_hours);
                self.completed_hours += hours;
                self.labor += hours * cost;
            }
        }
    }

    /// Adds one material usage. Only catalogued rows with a price count.
    pub fn add_material(&mut self, row: &MaterialCostRow) {
        if row.state != MaterialUsageState::Catalogato {
            return;
        }
        if let Some(price) = row.unit_price {
            self.materials += row.numero_confezioni * price;
        }
    }

    pub fn merge(&mut self, other: &CostTotals) {
        self.labor += other.labor;
        self.materials += other.materials;
        self.completed_hours += other.completed_hours;
        self.live_hours += other.live_hours;
        self.active_workers.extend(other.active_workers.iter().copied());
        self.has_live_data |= other.has_live_data;
    }

    /// Equipment is not tracked yet and contributes zero.
    pub fn equipment(&self) -> Decimal {
        Decimal::ZERO
    }

    pub fn total(&self) -> Decimal {
        self.labor + self.materials + self.equipment()
    }

    pub fn total_hours(&self) -> Decimal {
        self.completed_hours + self.live_hours
    }
}

/// `part / whole * 100`, or zero when `whole` is zero.
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        part / whole * Decimal::ONE_HUNDRED
    }
}

/// Builds the report for one site from its totals.
pub fn build_site_report(
    site: &ConstructionSite,
    totals: &CostTotals,
    range: DateRange,
    now: DateTime<Utc>,
) -> SiteCostReport {
    let total_cost = totals.total();
    let contract = site.margin_base();

    let margin_value = contract.map(|c| c - total_cost);
    let margin_percent = contract
        .zip(margin_value)
        .map(|(c, margin)| margin / c * Decimal::ONE_HUNDRED);
    let cost_vs_revenue = contract.map(|c| total_cost / c * Decimal::ONE_HUNDRED);

    SiteCostReport {
        site_id: site.id,
        site_name: site.name.clone(),
        status: site.status,
        contract_value: site.contract_value.map(round2),
        labor_cost: round2(totals.labor),
        materials_cost: round2(totals.materials),
        equipment_cost: round2(totals.equipment()),
        total_cost: round2(total_cost),
        margin_value: margin_value.map(round2),
        margin_percent: margin_percent.map(round2),
        cost_vs_revenue_percent: cost_vs_revenue.map(round2),
        margin_status: classify_margin(margin_percent),
        labor_incidence_percent: round2(percent_of(totals.labor, total_cost)),
        materials_incidence_percent: round2(percent_of(totals.materials, total_cost)),
        total_hours: round2(totals.total_hours()),
        live_hours: round2(totals.live_hours),
        active_workers: totals.active_workers.len() as i64,
        has_live_data: totals.has_live_data,
        is_active: totals.has_live_data,
        period: range,
        calculated_at: now,
    }
}

/// Groups rows by site and accumulates per-site totals.
fn totals_by_site(
    attendance: &[AttendanceCostRow],
    materials: &[MaterialCostRow],
    now: DateTime<Utc>,
) -> HashMap<Uuid, CostTotals> {
    let mut by_site: HashMap<Uuid, CostTotals> = HashMap::new();
    for row in attendance {
        by_site.entry(row.site_id).or_default().add_attendance(row, now);
    }
    for row in materials {
        by_site.entry(row.site_id).or_default().add_material(row);
    }
    by_site
}

/// Aggregates every site of a company into the dashboard.
pub fn build_company_dashboard(
    company_id: Uuid,
    sites: &[ConstructionSite],
    attendance: &[AttendanceCostRow],
    materials: &[MaterialCostRow],
    range: DateRange,
    now: DateTime<Utc>,
) -> CompanyCostDashboard {
    let by_site = totals_by_site(attendance, materials, now);
    let empty = CostTotals::default();

    let mut company = CostTotals::default();
    let mut contract_total = Decimal::ZERO;
    let mut margin_total = Decimal::ZERO;
    let mut reports = Vec::with_capacity(sites.len());

    for site in sites {
        let totals = by_site.get(&site.id).unwrap_or(&empty);
        company.merge(totals);
        if let Some(contract) = site.margin_base() {
            contract_total += contract;
            margin_total += contract - totals.total();
        }
        reports.push(build_site_report(site, totals, range, now));
    }

    let total_cost = company.total();
    let labor_incidence = percent_of(company.labor, total_cost);
    let materials_incidence = percent_of(company.materials, total_cost);
    let margin_growth = (contract_total > Decimal::ZERO)
        .then(|| margin_total / contract_total * Decimal::ONE_HUNDRED);
    let insight =
        margin_growth.map(|growth| classify_insight(growth, labor_incidence, materials_incidence));

    CompanyCostDashboard {
        company_id,
        site_count: sites.len() as i64,
        total_contract_value: round2(contract_total),
        labor_cost: round2(company.labor),
        materials_cost: round2(company.materials),
        equipment_cost: round2(company.equipment()),
        total_cost: round2(total_cost),
        total_margin: margin_growth.map(|_| round2(margin_total)),
        margin_growth_percent: margin_growth.map(round2),
        labor_incidence_percent: round2(labor_incidence),
        materials_incidence_percent: round2(materials_incidence),
        total_hours: round2(company.total_hours()),
        live_hours: round2(company.live_hours),
        active_workers: company.active_workers.len() as i64,
        has_live_data: company.has_live_data,
        insight,
        sites: reports,
        period: range,
        calculated_at: now,
    }
}

/// Owner-facing cost analytics over a [`CostDataSource`].
pub struct CostAnalyticsService<D> {
    source: D,
}

impl<D: CostDataSource> CostAnalyticsService<D> {
    pub fn new(source: D) -> Self {
        Self { source }
    }

    fn ensure_owner(ctx: &AuthContext) -> DomainResult<()> {
        if ctx.is_owner() {
            Ok(())
        } else {
            Err(DomainError::Forbidden(
                "Only company owners can view cost analytics".to_string(),
            ))
        }
    }

    async fn load_site(&self, ctx: &AuthContext, site_id: Uuid) -> DomainResult<ConstructionSite> {
        match self.source.find_site(ctx.company_id, site_id).await? {
            Some(site) if site.company_id == ctx.company_id => Ok(site),
            _ => Err(DomainError::NotFound("Construction site not found".to_string())),
        }
    }

    /// Cost report of one site.
    pub async fn site_report(
        &self,
        ctx: &AuthContext,
        site_id: Uuid,
        range: DateRange,
        now: DateTime<Utc>,
    ) -> DomainResult<SiteCostReport> {
        Self::ensure_owner(ctx)?;
        let site = self.load_site(ctx, site_id).await?;

        let ids = [site.id];
        let attendance = self.source.attendance_rows(ctx.company_id, &ids, range).await?;
        let materials = self.source.material_rows(ctx.company_id, &ids, range).await?;

        let mut totals = CostTotals::default();
        attendance.iter().for_each(|row| totals.add_attendance(row, now));
        materials.iter().for_each(|row| totals.add_material(row));

        debug!(
            company_id = %ctx.company_id,
            site_id = %site_id,
            attendance_rows = attendance.len(),
            material_rows = materials.len(),
            "Computed site cost report"
        );

        Ok(build_site_report(&site, &totals, range, now))
    }

    /// Cost reports of every site of the caller's company.
    pub async fn site_reports(
        &self,
        ctx: &AuthContext,
        range: DateRange,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<SiteCostReport>> {
        Ok(self.company_dashboard(ctx, range, now).await?.sites)
    }

    /// Company-wide dashboard with per-site breakdown and insight.
    pub async fn company_dashboard(
        &self,
        ctx: &AuthContext,
        range: DateRange,
        now: DateTime<Utc>,
    ) -> DomainResult<CompanyCostDashboard> {
        Self::ensure_owner(ctx)?;

        let sites = self.source.list_sites(ctx.company_id).await?;
        let ids: Vec<Uuid> = sites.iter().map(|s| s.id).collect();
        let (attendance, materials) = if ids.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            (
                self.source.attendance_rows(ctx.company_id, &ids, range).await?,
                self.source.material_rows(ctx.company_id, &ids, range).await?,
            )
        };

        debug!(
            company_id = %ctx.company_id,
            sites = sites.len(),
            "Computed company cost dashboard"
        );

        Ok(build_company_dashboard(
            ctx.company_id,
            &sites,
            &attendance,
            &materials,
            range,
            now,
        ))
    }
}
