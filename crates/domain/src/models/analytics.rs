//! Cost and margin analytics models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::site::{MaterialUsageState, SiteStatus};

// ============================================================================
// Queries
// ============================================================================

/// Query parameters shared by the analytics endpoints.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_analytics_range"))]
pub struct AnalyticsQuery {
    /// First day included
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// Last day included
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

fn validate_analytics_range(query: &AnalyticsQuery) -> Result<(), ValidationError> {
    match (query.from, query.to) {
        (Some(from), Some(to)) => shared::validation::validate_date_order(from, Some(to)),
        _ => Ok(()),
    }
}

impl AnalyticsQuery {
    pub fn range(&self) -> DateRange {
        DateRange {
            from: self.from,
            to: self.to,
        }
    }
}

/// Optional inclusive date bounds. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

// ============================================================================
// Aggregation inputs
// ============================================================================

/// One attendance row joined with the user's current hourly cost.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceCostRow {
    pub site_id: Uuid,
    pub user_id: Uuid,
    pub clock_in: DateTime<Utc>,
    pub clock_out: Option<DateTime<Utc>>,
    pub total_hours: Option<Decimal>,
    pub hourly_cost_snapshot: Option<Decimal>,
    pub user_hourly_cost: Option<Decimal>,
}

impl AttendanceCostRow {
    /// Snapshot if positive, else the user's current cost, else zero.
    pub fn effective_hourly_cost(&self) -> Decimal {
        self.hourly_cost_snapshot
            .filter(|c| *c > Decimal::ZERO)
            .or(self.user_hourly_cost)
            .unwrap_or(Decimal::ZERO)
    }
}

/// One material usage row with its catalog price, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialCostRow {
    pub site_id: Uuid,
    pub state: MaterialUsageState,
    pub numero_confezioni: Decimal,
    pub unit_price: Option<Decimal>,
}

// ============================================================================
// Reports
// ============================================================================

/// Margin semaphore used for UI colour-coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginStatus {
    Low,
    Medium,
    High,
    Unknown,
}

/// Company-level insight tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightTier {
    Critical,
    Stable,
    Healthy,
    Excellent,
}

/// Rule-based insight shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub tier: InsightTier,
    pub message: String,
}

/// Cost and margin of one site. Money and percentages carry two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteCostReport {
    pub site_id: Uuid,
    pub site_name: String,
    pub status: SiteStatus,
    pub contract_value: Option<Decimal>,
    pub labor_cost: Decimal,
    pub materials_cost: Decimal,
    /// Always zero until equipment tracking exists.
    pub equipment_cost: Decimal,
    pub total_cost: Decimal,
    pub margin_value: Option<Decimal>,
    pub margin_percent: Option<Decimal>,
    pub cost_vs_revenue_percent: Option<Decimal>,
    pub margin_status: MarginStatus,
    pub labor_incidence_percent: Decimal,
    pub materials_incidence_percent: Decimal,
    pub total_hours: Decimal,
    pub live_hours: Decimal,
    pub active_workers: i64,
    pub has_live_data: bool,
    pub is_active: bool,
    pub period: DateRange,
    pub calculated_at: DateTime<Utc>,
}

/// Company-wide aggregate across every site.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCostDashboard {
    pub company_id: Uuid,
    pub site_count: i64,
    pub total_contract_value: Decimal,
    pub labor_cost: Decimal,
    pub materials_cost: Decimal,
    pub equipment_cost: Decimal,
    pub total_cost: Decimal,
    /// Margin summed over sites with a contract value.
    pub total_margin: Option<Decimal>,
    pub margin_growth_percent: Option<Decimal>,
    pub labor_incidence_percent: Decimal,
    pub materials_incidence_percent: Decimal,
    pub total_hours: Decimal,
    pub live_hours: Decimal,
    pub active_workers: i64,
    pub has_live_data: bool,
    pub insight: Option<Insight>,
    pub sites: Vec<SiteCostReport>,
    pub period: DateRange,
    pub calculated_at: DateTime<Utc>,
}

/// Response for the all-sites listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteCostListResponse {
    pub data: Vec<SiteCostReport>,
}
