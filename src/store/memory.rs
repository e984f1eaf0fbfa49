//! In-memory durable store used by tests and local development.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::{
    Identity, IdentityStatus, OAuthLink, Role, RoleBinding, ServiceKey, Tenant, TenantKind,
};
use crate::store::{IdentityStore, OAuthLinkStore, RbacStore, ServiceKeyStore};

#[derive(Default)]
pub struct MemoryStore {
    identities: Mutex<HashMap<Uuid, Identity>>,
    roles: Mutex<HashMap<Uuid, Role>>,
    role_permissions: Mutex<HashMap<Uuid, Vec<String>>>,
    bindings: Mutex<Vec<RoleBinding>>,
    tenants: Mutex<HashMap<Uuid, Tenant>>,
    oauth_links: Mutex<HashMap<Uuid, OAuthLink>>,
    service_keys: Mutex<HashMap<Uuid, ServiceKey>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err(name: &str) -> AuthError {
    AuthError::Store(anyhow::anyhow!("{} mutex poisoned", name))
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError> {
        let identities = self.identities.lock().map_err(|_| lock_err("identities"))?;
        Ok(identities.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError> {
        let identities = self.identities.lock().map_err(|_| lock_err("identities"))?;
        Ok(identities
            .values()
            .find(|i| i.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert(&self, identity: &Identity) -> Result<(), AuthError> {
        let mut identities = self.identities.lock().map_err(|_| lock_err("identities"))?;
        if identities
            .values()
            .any(|i| i.email.eq_ignore_ascii_case(&identity.email))
        {
            return Err(AuthError::EmailAlreadyRegistered);
        }
        identities.insert(identity.id, identity.clone());
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: IdentityStatus) -> Result<(), AuthError> {
        let mut identities = self.identities.lock().map_err(|_| lock_err("identities"))?;
        let identity = identities.get_mut(&id).ok_or(AuthError::IdentityNotFound)?;
        identity.status = status;
        identity.updated_at = Utc::now();
        Ok(())
    }

    async fn append_auth_method(&self, id: Uuid, method: &str) -> Result<(), AuthError> {
        let mut identities = self.identities.lock().map_err(|_| lock_err("identities"))?;
        let identity = identities.get_mut(&id).ok_or(AuthError::IdentityNotFound)?;
        if !identity.auth_methods.iter().any(|m| m == method) {
            identity.auth_methods.push(method.to_string());
            identity.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_mfa(
        &self,
        id: Uuid,
        enabled: bool,
        encrypted_secret: Option<String>,
    ) -> Result<(), AuthError> {
        let mut identities = self.identities.lock().map_err(|_| lock_err("identities"))?;
        let identity = identities.get_mut(&id).ok_or(AuthError::IdentityNotFound)?;
        identity.mfa_enabled = enabled;
        identity.mfa_secret = encrypted_secret;
        identity.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl RbacStore for MemoryStore {
    async fn find_role_by_id(&self, id: Uuid) -> Result<Option<Role>, AuthError> {
        let roles = self.roles.lock().map_err(|_| lock_err("roles"))?;
        Ok(roles.get(&id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AuthError> {
        let roles = self.roles.lock().map_err(|_| lock_err("roles"))?;
        Ok(roles.values().find(|r| r.name == name).cloned())
    }

    async fn insert_role(&self, role: &Role) -> Result<(), AuthError> {
        let mut roles = self.roles.lock().map_err(|_| lock_err("roles"))?;
        roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn set_role_permissions(
        &self,
        role_id: Uuid,
        permissions: Vec<String>,
    ) -> Result<(), AuthError> {
        let mut map = self
            .role_permissions
            .lock()
            .map_err(|_| lock_err("role_permissions"))?;
        map.insert(role_id, permissions);
        Ok(())
    }

    async fn permissions_for_role(&self, role_id: Uuid) -> Result<Vec<String>, AuthError> {
        let map = self
            .role_permissions
            .lock()
            .map_err(|_| lock_err("role_permissions"))?;
        Ok(map.get(&role_id).cloned().unwrap_or_default())
    }

    async fn bindings_for(&self, identity_id: Uuid) -> Result<Vec<RoleBinding>, AuthError> {
        let bindings = self.bindings.lock().map_err(|_| lock_err("bindings"))?;
        Ok(bindings
            .iter()
            .filter(|b| b.identity_id == identity_id)
            .cloned()
            .collect())
    }

    async fn insert_binding(&self, binding: &RoleBinding) -> Result<bool, AuthError> {
        let mut bindings = self.bindings.lock().map_err(|_| lock_err("bindings"))?;
        if bindings.contains(binding) {
            return Ok(false);
        }
        bindings.push(binding.clone());
        Ok(true)
    }

    async fn delete_binding(&self, binding: &RoleBinding) -> Result<bool, AuthError> {
        let mut bindings = self.bindings.lock().map_err(|_| lock_err("bindings"))?;
        let before = bindings.len();
        bindings.retain(|b| b != binding);
        Ok(bindings.len() < before)
    }

    async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>, AuthError> {
        let tenants = self.tenants.lock().map_err(|_| lock_err("tenants"))?;
        Ok(tenants.get(&id).cloned())
    }

    async fn find_platform_tenant(&self) -> Result<Option<Tenant>, AuthError> {
        let tenants = self.tenants.lock().map_err(|_| lock_err("tenants"))?;
        Ok(tenants
            .values()
            .find(|t| t.kind == TenantKind::Platform)
            .cloned())
    }

    async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), AuthError> {
        let mut tenants = self.tenants.lock().map_err(|_| lock_err("tenants"))?;
        tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }
}

#[async_trait]
impl OAuthLinkStore for MemoryStore {
    async fn find_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OAuthLink>, AuthError> {
        let links = self.oauth_links.lock().map_err(|_| lock_err("oauth_links"))?;
        Ok(links
            .values()
            .find(|l| l.provider == provider && l.provider_user_id == provider_user_id)
            .cloned())
    }

    async fn insert(&self, link: &OAuthLink) -> Result<(), AuthError> {
        let mut links = self.oauth_links.lock().map_err(|_| lock_err("oauth_links"))?;
        links.insert(link.id, link.clone());
        Ok(())
    }

    async fn update(&self, link: &OAuthLink) -> Result<(), AuthError> {
        let mut links = self.oauth_links.lock().map_err(|_| lock_err("oauth_links"))?;
        links.insert(link.id, link.clone());
        Ok(())
    }

    async fn count_for_identity(&self, identity_id: Uuid) -> Result<usize, AuthError> {
        let links = self.oauth_links.lock().map_err(|_| lock_err("oauth_links"))?;
        Ok(links.values().filter(|l| l.identity_id == identity_id).count())
    }
}

#[async_trait]
impl ServiceKeyStore for MemoryStore {
    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ServiceKey>, AuthError> {
        let keys = self.service_keys.lock().map_err(|_| lock_err("service_keys"))?;
        Ok(keys.values().find(|k| k.key_hash == key_hash).cloned())
    }

    async fn insert(&self, key: &ServiceKey) -> Result<(), AuthError> {
        let mut keys = self.service_keys.lock().map_err(|_| lock_err("service_keys"))?;
        keys.insert(key.id, key.clone());
        Ok(())
    }

    async fn touch_last_used(&self, id: Uuid) -> Result<(), AuthError> {
        let mut keys = self.service_keys.lock().map_err(|_| lock_err("service_keys"))?;
        if let Some(key) = keys.get_mut(&id) {
            key.last_used_at = Some(Utc::now());
        }
        Ok(())
    }
}
