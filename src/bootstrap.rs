//! One-shot seeding of the role/permission matrix, the platform tenant and
//! the super-admin identity. Safe to run on every startup; existing rows are
//! left alone.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::AuthError;
use crate::models::{
    Identity, IdentityStatus, Role, RoleBinding, RoleScope, Tenant, TenantKind, SUPER_ADMIN_LEVEL,
    SUPER_ADMIN_ROLE,
};
use crate::store::{IdentityStore, RbacStore};
use crate::utils::password::{hash_password, Password};

pub const PLATFORM_TENANT_NAME: &str = "platform";

/// (name, description, scope, level). Level spacing leaves room for custom
/// roles between the built-ins.
const DEFAULT_ROLES: [(&str, &str, RoleScope, i32); 6] = [
    (SUPER_ADMIN_ROLE, "Full platform control", RoleScope::Platform, SUPER_ADMIN_LEVEL),
    ("PLATFORM_ADMIN", "Manage organizations", RoleScope::Platform, 90),
    ("TENANT_OWNER", "Owner of organization", RoleScope::Tenant, 80),
    ("TENANT_ADMIN", "Admin inside tenant", RoleScope::Tenant, 60),
    ("TENANT_MANAGER", "Manager inside tenant", RoleScope::Tenant, 40),
    ("TENANT_USER", "Standard tenant user", RoleScope::Tenant, 20),
];

pub const DEFAULT_ROLE_NAMES: [&str; 6] = [
    SUPER_ADMIN_ROLE,
    "PLATFORM_ADMIN",
    "TENANT_OWNER",
    "TENANT_ADMIN",
    "TENANT_MANAGER",
    "TENANT_USER",
];

const DEFAULT_PERMISSIONS: [&str; 12] = [
    "platform.users.view",
    "platform.users.manage",
    "platform.tenants.view",
    "platform.tenants.manage",
    "platform.roles.assign",
    "tenant.view",
    "tenant.update",
    "tenant.delete",
    "tenant.users.view",
    "tenant.users.manage",
    "tenant.roles.view",
    "tenant.roles.assign",
];

fn role_permissions(role_name: &str) -> Vec<String> {
    let permissions: &[&str] = match role_name {
        SUPER_ADMIN_ROLE => &DEFAULT_PERMISSIONS,
        "PLATFORM_ADMIN" => &[
            "platform.users.view",
            "platform.tenants.view",
            "platform.tenants.manage",
            "tenant.view",
            "tenant.users.view",
        ],
        "TENANT_OWNER" => &[
            "tenant.view",
            "tenant.update",
            "tenant.delete",
            "tenant.users.view",
            "tenant.users.manage",
            "tenant.roles.view",
            "tenant.roles.assign",
        ],
        "TENANT_ADMIN" => &[
            "tenant.view",
            "tenant.update",
            "tenant.users.view",
            "tenant.users.manage",
            "tenant.roles.view",
            "tenant.roles.assign",
        ],
        "TENANT_MANAGER" => &[
            "tenant.view",
            "tenant.users.view",
            "tenant.roles.view",
            "tenant.roles.assign",
        ],
        "TENANT_USER" => &["tenant.view"],
        _ => &[],
    };
    permissions.iter().map(|p| p.to_string()).collect()
}

pub struct Bootstrap {
    identities: Arc<dyn IdentityStore>,
    rbac: Arc<dyn RbacStore>,
}

impl Bootstrap {
    pub fn new(identities: Arc<dyn IdentityStore>, rbac: Arc<dyn RbacStore>) -> Self {
        Self { identities, rbac }
    }

    /// Seed roles, permissions, the platform tenant and the super admin.
    /// Idempotent end to end.
    pub async fn run(&self, config: &EngineConfig) -> Result<(), AuthError> {
        self.seed_roles().await?;
        let platform = self.seed_platform_tenant().await?;
        self.seed_super_admin(config, platform.id).await?;
        tracing::info!("Bootstrap seeding complete");
        Ok(())
    }

    async fn seed_roles(&self) -> Result<(), AuthError> {
        for (name, description, scope, level) in DEFAULT_ROLES {
            let role = match self.rbac.find_role_by_name(name).await? {
                Some(existing) => existing,
                None => {
                    tracing::info!(role = %name, level, "Seeding role");
                    let role = Role::new(
                        name.to_string(),
                        Some(description.to_string()),
                        scope,
                        level,
                    );
                    self.rbac.insert_role(&role).await?;
                    role
                }
            };
            self.rbac
                .set_role_permissions(role.id, role_permissions(name))
                .await?;
        }
        Ok(())
    }

    async fn seed_platform_tenant(&self) -> Result<Tenant, AuthError> {
        if let Some(existing) = self.rbac.find_platform_tenant().await? {
            return Ok(existing);
        }
        tracing::info!("Seeding platform tenant");
        let tenant = Tenant::new(PLATFORM_TENANT_NAME.to_string(), TenantKind::Platform);
        self.rbac.insert_tenant(&tenant).await?;
        Ok(tenant)
    }

    async fn seed_super_admin(
        &self,
        config: &EngineConfig,
        platform_tenant_id: Uuid,
    ) -> Result<(), AuthError> {
        let identity = match self
            .identities
            .find_by_email(&config.superadmin_email)
            .await?
        {
            Some(existing) => existing,
            None => {
                tracing::info!(email = %config.superadmin_email, "Seeding super admin");
                let password = Password::new(config.superadmin_password.clone());
                let mut identity = Identity::new(
                    config.superadmin_email.clone(),
                    Some(hash_password(&password)?),
                );
                identity.status = IdentityStatus::Active;
                identity.auth_methods = vec!["password".to_string()];
                self.identities.insert(&identity).await?;
                identity
            }
        };

        let role = self
            .rbac
            .find_role_by_name(SUPER_ADMIN_ROLE)
            .await?
            .ok_or_else(|| AuthError::RoleNotFound(SUPER_ADMIN_ROLE.to_string()))?;

        // insert_binding is idempotent, so re-running never duplicates.
        self.rbac
            .insert_binding(&RoleBinding {
                identity_id: identity.id,
                role_id: role.id,
                tenant_id: platform_tenant_id,
            })
            .await?;
        Ok(())
    }
}
