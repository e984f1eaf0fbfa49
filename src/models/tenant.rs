//! Tenant model - isolated namespace for role bindings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantKind {
    /// The single system tenant anchoring platform-scoped bindings.
    Platform,
    Customer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub kind: TenantKind,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(name: String, kind: TenantKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            kind,
            created_at: Utc::now(),
        }
    }
}
