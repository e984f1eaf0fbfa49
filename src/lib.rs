//! Centralized identity and authorization engine.
//!
//! Owns the credential lifecycle end to end: password, magic-link, TOTP and
//! OAuth logins, token issue/verify/revoke, the session registry, the RBAC
//! hierarchy, and the introspection boundary other services authenticate
//! against. Durable storage and message delivery are trait seams; the only
//! live backing store is the ephemeral ticket store.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

use crate::bootstrap::Bootstrap;
use crate::config::EngineConfig;
use crate::error::AuthError;
use crate::services::{
    AuthService, IntrospectionService, MagicLinkFlow, MagicLinkSender, MethodRegistry,
    MfaChallengeFlow, OAuthIdentityResolver, OAuthStateFlow, PermissionEngine,
    RevocationRegistry, RoleService, SessionManager, TicketStore, TokenCodec,
};
use crate::store::{IdentityStore, OAuthLinkStore, RbacStore, ServiceKeyStore};

/// All engine services wired over one set of stores. Construct once at
/// startup and share.
pub struct AuthEngine {
    pub auth: Arc<AuthService>,
    pub magic_link: Arc<MagicLinkFlow>,
    pub mfa: Arc<MfaChallengeFlow>,
    pub oauth_state: Arc<OAuthStateFlow>,
    pub oauth: Arc<OAuthIdentityResolver>,
    pub sessions: Arc<SessionManager>,
    pub revocations: Arc<RevocationRegistry>,
    pub permissions: Arc<PermissionEngine>,
    pub roles: Arc<RoleService>,
    pub introspection: Arc<IntrospectionService>,
    pub methods: MethodRegistry,
    bootstrap: Bootstrap,
    config: EngineConfig,
}

/// The store handles the engine is wired over.
pub struct EngineStores {
    pub identities: Arc<dyn IdentityStore>,
    pub rbac: Arc<dyn RbacStore>,
    pub oauth_links: Arc<dyn OAuthLinkStore>,
    pub service_keys: Arc<dyn ServiceKeyStore>,
    pub tickets: Arc<dyn TicketStore>,
}

impl AuthEngine {
    pub fn new(
        config: EngineConfig,
        stores: EngineStores,
        sender: Arc<dyn MagicLinkSender>,
    ) -> Result<Self, AuthError> {
        config.validate()?;

        let codec = Arc::new(TokenCodec::new(&config));
        let sessions = Arc::new(SessionManager::new(
            stores.tickets.clone(),
            config.max_concurrent_sessions,
        ));
        let revocations = Arc::new(RevocationRegistry::new(stores.tickets.clone()));
        let permissions = Arc::new(PermissionEngine::new(stores.rbac.clone()));

        let mfa = Arc::new(MfaChallengeFlow::new(
            &config,
            stores.identities.clone(),
            stores.tickets.clone(),
            codec.clone(),
            sessions.clone(),
        ));
        let auth = Arc::new(AuthService::new(
            &config,
            stores.identities.clone(),
            codec.clone(),
            sessions.clone(),
            revocations.clone(),
            mfa.clone(),
        ));
        let magic_link = Arc::new(MagicLinkFlow::new(
            &config,
            stores.identities.clone(),
            stores.tickets.clone(),
            codec.clone(),
            sessions.clone(),
            sender,
        ));
        let oauth_state = Arc::new(OAuthStateFlow::new(&config, stores.tickets.clone()));
        let oauth = Arc::new(OAuthIdentityResolver::new(
            &config,
            stores.identities.clone(),
            stores.oauth_links.clone(),
            codec.clone(),
            sessions.clone(),
        ));
        let roles = Arc::new(RoleService::new(stores.rbac.clone(), permissions.clone()));
        let introspection = Arc::new(IntrospectionService::new(
            codec,
            revocations.clone(),
            stores.identities.clone(),
            permissions.clone(),
            stores.service_keys,
        ));
        let bootstrap = Bootstrap::new(stores.identities, stores.rbac);

        Ok(Self {
            auth,
            magic_link,
            mfa,
            oauth_state,
            oauth,
            sessions,
            revocations,
            permissions,
            roles,
            introspection,
            methods: MethodRegistry::with_defaults(),
            bootstrap,
            config,
        })
    }

    /// Seed the default roles, platform tenant and super admin. Idempotent.
    pub async fn bootstrap(&self) -> Result<(), AuthError> {
        self.bootstrap.run(&self.config).await
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
