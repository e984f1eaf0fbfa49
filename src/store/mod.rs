//! Durable-store boundaries.
//!
//! Users, tenants, roles, bindings, OAuth links and service keys live in a
//! durable store owned outside this crate. The engine only depends on these
//! traits; [`MemoryStore`] backs tests and local development.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::{
    Identity, IdentityStatus, OAuthLink, Role, RoleBinding, ServiceKey, Tenant,
};

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError>;
    async fn insert(&self, identity: &Identity) -> Result<(), AuthError>;
    async fn set_status(&self, id: Uuid, status: IdentityStatus) -> Result<(), AuthError>;
    /// Append a method name to the identity's linked-methods set. Must be
    /// idempotent: appending a name already present is a no-op.
    async fn append_auth_method(&self, id: Uuid, method: &str) -> Result<(), AuthError>;
    async fn set_mfa(
        &self,
        id: Uuid,
        enabled: bool,
        encrypted_secret: Option<String>,
    ) -> Result<(), AuthError>;
}

#[async_trait]
pub trait RbacStore: Send + Sync {
    async fn find_role_by_id(&self, id: Uuid) -> Result<Option<Role>, AuthError>;
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AuthError>;
    async fn insert_role(&self, role: &Role) -> Result<(), AuthError>;
    /// Replace the permission set attached to a role.
    async fn set_role_permissions(
        &self,
        role_id: Uuid,
        permissions: Vec<String>,
    ) -> Result<(), AuthError>;
    async fn permissions_for_role(&self, role_id: Uuid) -> Result<Vec<String>, AuthError>;

    async fn bindings_for(&self, identity_id: Uuid) -> Result<Vec<RoleBinding>, AuthError>;
    /// Insert a binding; returns false if it already existed.
    async fn insert_binding(&self, binding: &RoleBinding) -> Result<bool, AuthError>;
    /// Delete a binding; returns false if it did not exist.
    async fn delete_binding(&self, binding: &RoleBinding) -> Result<bool, AuthError>;

    async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>, AuthError>;
    async fn find_platform_tenant(&self) -> Result<Option<Tenant>, AuthError>;
    async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), AuthError>;
}

#[async_trait]
pub trait OAuthLinkStore: Send + Sync {
    async fn find_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OAuthLink>, AuthError>;
    async fn insert(&self, link: &OAuthLink) -> Result<(), AuthError>;
    async fn update(&self, link: &OAuthLink) -> Result<(), AuthError>;
    async fn count_for_identity(&self, identity_id: Uuid) -> Result<usize, AuthError>;
}

#[async_trait]
pub trait ServiceKeyStore: Send + Sync {
    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ServiceKey>, AuthError>;
    async fn insert(&self, key: &ServiceKey) -> Result<(), AuthError>;
    async fn touch_last_used(&self, id: Uuid) -> Result<(), AuthError>;
}
