//! Role grants and revocations under the hierarchy rules.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::AuthError;
use crate::models::{Role, RoleBinding, RoleScope, Tenant, TenantKind, SUPER_ADMIN_ROLE};
use crate::services::permission::PermissionEngine;
use crate::store::RbacStore;

pub struct RoleService {
    rbac: Arc<dyn RbacStore>,
    permissions: Arc<PermissionEngine>,
}

impl RoleService {
    pub fn new(rbac: Arc<dyn RbacStore>, permissions: Arc<PermissionEngine>) -> Self {
        Self { rbac, permissions }
    }

    /// Grant a role to an identity within a tenant. Idempotent: re-granting
    /// an existing binding returns Ok(false).
    pub async fn assign_role(
        &self,
        actor_id: Uuid,
        target_identity_id: Uuid,
        role_name: &str,
        tenant_id: Uuid,
    ) -> Result<bool, AuthError> {
        let (role, _) = self.check_role_change(actor_id, role_name, tenant_id).await?;

        let binding = RoleBinding {
            identity_id: target_identity_id,
            role_id: role.id,
            tenant_id,
        };
        let inserted = self.rbac.insert_binding(&binding).await?;
        if inserted {
            tracing::info!(
                actor_id = %actor_id,
                target_identity_id = %target_identity_id,
                role = %role.name,
                tenant_id = %tenant_id,
                "Role assigned"
            );
        }
        Ok(inserted)
    }

    /// Revoke a role binding. Returns false if the binding did not exist.
    pub async fn remove_role(
        &self,
        actor_id: Uuid,
        target_identity_id: Uuid,
        role_name: &str,
        tenant_id: Uuid,
    ) -> Result<bool, AuthError> {
        let (role, _) = self.check_role_change(actor_id, role_name, tenant_id).await?;

        let binding = RoleBinding {
            identity_id: target_identity_id,
            role_id: role.id,
            tenant_id,
        };
        let removed = self.rbac.delete_binding(&binding).await?;
        if removed {
            tracing::info!(
                actor_id = %actor_id,
                target_identity_id = %target_identity_id,
                role = %role.name,
                tenant_id = %tenant_id,
                "Role removed"
            );
        }
        Ok(removed)
    }

    /// Shared gate for grant and revoke: role exists, it is not the
    /// bootstrap-only top role, its scope matches the tenant kind, and the
    /// actor holds both the assign permission and a strictly higher level.
    async fn check_role_change(
        &self,
        actor_id: Uuid,
        role_name: &str,
        tenant_id: Uuid,
    ) -> Result<(Role, Tenant), AuthError> {
        let role = self
            .rbac
            .find_role_by_name(role_name)
            .await?
            .ok_or_else(|| AuthError::RoleNotFound(role_name.to_string()))?;

        if role.name == SUPER_ADMIN_ROLE {
            return Err(AuthError::PermissionDenied(
                "SUPER_ADMIN is bootstrap-only".to_string(),
            ));
        }

        let tenant = self
            .rbac
            .find_tenant(tenant_id)
            .await?
            .ok_or(AuthError::TenantNotFound)?;

        match (role.scope, tenant.kind) {
            (RoleScope::Platform, kind) if kind != TenantKind::Platform => {
                return Err(AuthError::TenantScopeViolation(
                    "platform roles bind only in the platform tenant".to_string(),
                ));
            }
            (RoleScope::Tenant, TenantKind::Platform) => {
                return Err(AuthError::TenantScopeViolation(
                    "tenant roles do not bind in the platform tenant".to_string(),
                ));
            }
            _ => {}
        }

        let required = match role.scope {
            RoleScope::Tenant => "tenant.roles.assign",
            RoleScope::Platform => "platform.roles.assign",
        };
        if !self
            .permissions
            .has_permission(actor_id, required, Some(tenant_id))
            .await?
        {
            return Err(AuthError::PermissionDenied(required.to_string()));
        }

        self.permissions
            .authorize_role_change(actor_id, &role, tenant_id)
            .await?;

        Ok((role, tenant))
    }

    /// Roles assignable inside a customer tenant.
    pub async fn list_tenant_roles(&self) -> Result<Vec<Role>, AuthError> {
        // Backed by the seeded role set; filter out platform-scoped roles.
        let mut roles = Vec::new();
        for name in crate::bootstrap::DEFAULT_ROLE_NAMES {
            if let Some(role) = self.rbac.find_role_by_name(name).await? {
                if role.scope == RoleScope::Tenant {
                    roles.push(role);
                }
            }
        }
        Ok(roles)
    }
}
