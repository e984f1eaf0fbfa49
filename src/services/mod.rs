pub mod auth;
pub mod introspect;
pub mod magic_link;
pub mod mfa;
pub mod oauth;
pub mod permission;
pub mod revocation;
pub mod role;
pub mod session;
pub mod strategy;
pub mod tickets;
pub mod token;

pub use auth::{AuthService, LoginOutcome, TokenPair};
pub use introspect::{Introspection, IntrospectionPayload, IntrospectionService};
pub use magic_link::{ConsoleMagicLinkSender, MagicLinkFlow, MagicLinkSender};
pub use mfa::{EnrollmentStart, MfaChallengeFlow};
pub use oauth::{OAuthIdentityResolver, OAuthStateFlow};
pub use permission::{PermissionEngine, NO_ROLE_LEVEL};
pub use revocation::RevocationRegistry;
pub use role::RoleService;
pub use session::SessionManager;
pub use strategy::{AuthMethod, CredentialShape, MethodRegistry};
pub use tickets::{MemoryTicketStore, RedisTicketStore, TicketStore};
pub use token::{Claims, TokenCodec, TokenKind};
