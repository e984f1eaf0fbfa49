//! Domain models for the identity and authorization engine.

mod identity;
mod oauth_link;
mod role;
mod service_key;
mod session;
mod tenant;

pub use identity::{Identity, IdentityStatus};
pub use oauth_link::{OAuthLink, ProviderProfile, ProviderTokens};
pub use role::{Role, RoleBinding, RoleScope, SUPER_ADMIN_LEVEL, SUPER_ADMIN_ROLE};
pub use service_key::ServiceKey;
pub use session::Session;
pub use tenant::{Tenant, TenantKind};
