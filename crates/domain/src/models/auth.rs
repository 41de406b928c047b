//! Authenticated caller context.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Role of a user inside their company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Worker,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "worker" => Ok(Role::Worker),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::Worker => write!(f, "worker"),
        }
    }
}

/// Tenant-scoped identity of the caller.
///
/// Built once at the HTTP boundary from verified token claims and passed
/// explicitly into every core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    pub fn new(user_id: Uuid, company_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            company_id,
            role,
        }
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}
