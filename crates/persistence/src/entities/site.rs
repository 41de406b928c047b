//! Construction site and cost-input entities.

use chrono::{DateTime, Utc};
use domain::models::analytics::{AttendanceCostRow, MaterialCostRow};
use domain::models::{ConstructionSite, MaterialUsageState, SiteStatus};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for site status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "site_status", rename_all = "snake_case")]
pub enum SiteStatusDb {
    Pianificato,
    InCorso,
    Sospeso,
    Completato,
}

/// Database enum for material usage state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "material_usage_state", rename_all = "snake_case")]
pub enum MaterialUsageStateDb {
    Catalogato,
    DaApprovare,
    Rifiutato,
}

db_enum_mapping!(SiteStatus <=> SiteStatusDb { Pianificato, InCorso, Sospeso, Completato });
db_enum_mapping!(MaterialUsageState <=> MaterialUsageStateDb {
    Catalogato,
    DaApprovare,
    Rifiutato,
});

/// Database row mapping for the construction_sites table.
#[derive(Debug, Clone, FromRow)]
pub struct ConstructionSiteEntity {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub status: SiteStatusDb,
    pub contract_value: Option<Decimal>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ConstructionSiteEntity> for ConstructionSite {
    fn from(e: ConstructionSiteEntity) -> Self {
        Self {
            id: e.id,
            company_id: e.company_id,
            name: e.name,
            address: e.address,
            status: e.status.into(),
            contract_value: e.contract_value,
            deleted_at: e.deleted_at,
            created_at: e.created_at,
        }
    }
}

/// Attendance joined with the worker's current hourly cost.
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceCostEntity {
    pub site_id: Uuid,
    pub user_id: Uuid,
    pub clock_in_time: DateTime<Utc>,
    pub clock_out_time: Option<DateTime<Utc>>,
    pub total_hours: Option<Decimal>,
    pub hourly_cost: Option<Decimal>,
    pub user_hourly_cost: Option<Decimal>,
}

impl From<AttendanceCostEntity> for AttendanceCostRow {
    fn from(e: AttendanceCostEntity) -> Self {
        Self {
            site_id: e.site_id,
            user_id: e.user_id,
            clock_in: e.clock_in_time,
            clock_out: e.clock_out_time,
            total_hours: e.total_hours,
            hourly_cost_snapshot: e.hourly_cost,
            user_hourly_cost: e.user_hourly_cost,
        }
    }
}

/// Material usage joined with its catalog price.
#[derive(Debug, Clone, FromRow)]
pub struct MaterialCostEntity {
    pub site_id: Uuid,
    pub state: MaterialUsageStateDb,
    pub numero_confezioni: Decimal,
    pub unit_price: Option<Decimal>,
}

impl From<MaterialCostEntity> for MaterialCostRow {
    fn from(e: MaterialCostEntity) -> Self {
        Self {
            site_id: e.site_id,
            state: e.state.into(),
            numero_confezioni: e.numero_confezioni,
            unit_price: e.unit_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_entity_to_domain() {
        let entity = ConstructionSiteEntity {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "Residenza Navigli".to_string(),
            address: Some("Via Vigevano 12, Milano".to_string()),
            status: SiteStatusDb::InCorso,
            contract_value: Some(Decimal::new(25000000, 2)),
            deleted_at: None,
            created_at: Utc::now(),
        };

        let site = ConstructionSite::from(entity);
        assert_eq!(site.status, SiteStatus::InCorso);
        assert_eq!(site.margin_base(), Some(Decimal::from(250000)));
    }

    #[test]
    fn test_material_entity_keeps_state() {
        let entity = MaterialCostEntity {
            site_id: Uuid::new_v4(),
            state: MaterialUsageStateDb::DaApprovare,
            numero_confezioni: Decimal::from(4),
            unit_price: None,
        };
        assert_eq!(
            MaterialCostRow::from(entity).state,
            MaterialUsageState::DaApprovare
        );
    }
}
