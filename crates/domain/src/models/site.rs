//! Construction site and material usage models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status of a construction site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    Pianificato,
    InCorso,
    Sospeso,
    Completato,
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteStatus::Pianificato => write!(f, "pianificato"),
            SiteStatus::InCorso => write!(f, "in_corso"),
            SiteStatus::Sospeso => write!(f, "sospeso"),
            SiteStatus::Completato => write!(f, "completato"),
        }
    }
}

impl FromStr for SiteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pianificato" => Ok(SiteStatus::Pianificato),
            "in_corso" => Ok(SiteStatus::InCorso),
            "sospeso" => Ok(SiteStatus::Sospeso),
            "completato" => Ok(SiteStatus::Completato),
            _ => Err(format!("Unknown site status: {}", s)),
        }
    }
}

/// A company-scoped construction site.
///
/// Soft-deleted sites keep their `deleted_at` timestamp and are excluded from
/// lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructionSite {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub status: SiteStatus,
    /// Missing or non-positive values disable margin computation.
    pub contract_value: Option<Decimal>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ConstructionSite {
    /// Contract value usable as a margin base.
    pub fn margin_base(&self) -> Option<Decimal> {
        self.contract_value.filter(|v| *v > Decimal::ZERO)
    }
}

/// Approval state of a material usage record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialUsageState {
    /// Matched to a catalog entry; counts toward site cost.
    Catalogato,
    DaApprovare,
    Rifiutato,
}

impl std::fmt::Display for MaterialUsageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaterialUsageState::Catalogato => write!(f, "catalogato"),
            MaterialUsageState::DaApprovare => write!(f, "da_approvare"),
            MaterialUsageState::Rifiutato => write!(f, "rifiutato"),
        }
    }
}
