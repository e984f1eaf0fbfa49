//! Role and role-binding models for the level-ordered RBAC hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Level of the bootstrap-only SUPER_ADMIN role. Roles at this level can
/// never be the target of an assign/remove call.
pub const SUPER_ADMIN_LEVEL: i32 = 100;

pub const SUPER_ADMIN_ROLE: &str = "SUPER_ADMIN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleScope {
    /// Applies irrespective of tenant context.
    Platform,
    Tenant,
}

/// A named bundle of permissions carrying a numeric authority level in
/// [0, 100]. Level strictly orders who may grant or revoke what: an actor
/// may only act on roles of strictly lower level than their own maximum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub scope: RoleScope,
    pub level: i32,
    pub created_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: String, description: Option<String>, scope: RoleScope, level: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            scope,
            level,
            created_at: Utc::now(),
        }
    }
}

/// (identity, role, tenant) join record. Composite-keyed, no surrogate id;
/// the other three entities are referenced by id and resolved by lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub identity_id: Uuid,
    pub role_id: Uuid,
    pub tenant_id: Uuid,
}
