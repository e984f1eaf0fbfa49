//! Effective-permission and hierarchy computation.
//!
//! A binding counts toward a tenant context if it is bound to that tenant, or
//! if its role is platform-scoped. Platform operators therefore carry their
//! level and permissions into every tenant without per-tenant bindings.

use std::collections::BTreeSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::AuthError;
use crate::models::{Role, RoleScope, SUPER_ADMIN_LEVEL, SUPER_ADMIN_ROLE};
use crate::store::RbacStore;

/// Level of an identity holding no roles in a context. Strictly below every
/// real role.
pub const NO_ROLE_LEVEL: i32 = -1;

pub struct PermissionEngine {
    rbac: Arc<dyn RbacStore>,
}

impl PermissionEngine {
    pub fn new(rbac: Arc<dyn RbacStore>) -> Self {
        Self { rbac }
    }

    async fn roles_in_context(
        &self,
        identity_id: Uuid,
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<Role>, AuthError> {
        let mut roles = Vec::new();
        for binding in self.rbac.bindings_for(identity_id).await? {
            let Some(role) = self.rbac.find_role_by_id(binding.role_id).await? else {
                continue;
            };
            let counts = match tenant_id {
                Some(tenant) => binding.tenant_id == tenant || role.scope == RoleScope::Platform,
                None => role.scope == RoleScope::Platform,
            };
            if counts {
                roles.push(role);
            }
        }
        Ok(roles)
    }

    /// Union of permissions from every binding that counts in the context.
    pub async fn effective_permissions(
        &self,
        identity_id: Uuid,
        tenant_id: Option<Uuid>,
    ) -> Result<BTreeSet<String>, AuthError> {
        let mut permissions = BTreeSet::new();
        for role in self.roles_in_context(identity_id, tenant_id).await? {
            permissions.extend(self.rbac.permissions_for_role(role.id).await?);
        }
        Ok(permissions)
    }

    pub async fn has_permission(
        &self,
        identity_id: Uuid,
        permission: &str,
        tenant_id: Option<Uuid>,
    ) -> Result<bool, AuthError> {
        Ok(self
            .effective_permissions(identity_id, tenant_id)
            .await?
            .contains(permission))
    }

    /// Highest role level the identity holds in the context, or
    /// [`NO_ROLE_LEVEL`] if it holds none.
    pub async fn max_level(
        &self,
        identity_id: Uuid,
        tenant_id: Option<Uuid>,
    ) -> Result<i32, AuthError> {
        Ok(self
            .roles_in_context(identity_id, tenant_id)
            .await?
            .iter()
            .map(|role| role.level)
            .max()
            .unwrap_or(NO_ROLE_LEVEL))
    }

    /// Tenants this identity is bound to, deduplicated.
    pub async fn tenant_ids(&self, identity_id: Uuid) -> Result<Vec<Uuid>, AuthError> {
        let mut ids: Vec<Uuid> = self
            .rbac
            .bindings_for(identity_id)
            .await?
            .into_iter()
            .map(|binding| binding.tenant_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    /// Enforce the hierarchy rule for granting or revoking a role: the actor
    /// must hold a level strictly above the target role's, and the top role
    /// is never grantable at all.
    pub async fn authorize_role_change(
        &self,
        actor_id: Uuid,
        target_role: &Role,
        tenant_id: Uuid,
    ) -> Result<(), AuthError> {
        let actor_level = self.max_level(actor_id, Some(tenant_id)).await?;

        if target_role.name == SUPER_ADMIN_ROLE || target_role.level >= SUPER_ADMIN_LEVEL {
            return Err(AuthError::LevelViolation {
                actor_level,
                target_level: target_role.level,
            });
        }

        if actor_level <= target_role.level {
            return Err(AuthError::LevelViolation {
                actor_level,
                target_level: target_role.level,
            });
        }
        Ok(())
    }
}
