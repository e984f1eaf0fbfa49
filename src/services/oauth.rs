//! OAuth callback plumbing: CSRF state tickets and identity resolution.
//!
//! Provider redirects and token exchanges happen outside this crate. What
//! arrives here is a normalized [`ProviderProfile`]; this module decides
//! which identity it belongs to and finishes the login.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::AuthError;
use crate::models::{Identity, IdentityStatus, OAuthLink, ProviderProfile};
use crate::services::session::SessionManager;
use crate::services::tickets::TicketStore;
use crate::services::token::TokenCodec;
use crate::store::{IdentityStore, OAuthLinkStore};

use super::auth::TokenPair;

fn state_key(state: &str) -> String {
    format!("oauth_state:{}", state)
}

/// Single-use CSRF state for the authorization-code round trip.
pub struct OAuthStateFlow {
    tickets: Arc<dyn TicketStore>,
    ttl_seconds: u64,
}

impl OAuthStateFlow {
    pub fn new(config: &EngineConfig, tickets: Arc<dyn TicketStore>) -> Self {
        Self {
            tickets,
            ttl_seconds: config.oauth_state_ttl_seconds,
        }
    }

    /// Mint a state token to embed in the authorization URL. Any tenant
    /// context rides along in the ticket value so the callback learns it
    /// without trusting the query string.
    pub async fn begin(&self, tenant_id: Option<Uuid>) -> Result<String, AuthError> {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let state = URL_SAFE_NO_PAD.encode(bytes);

        let value = tenant_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        self.tickets
            .put(&state_key(&state), &value, Duration::from_secs(self.ttl_seconds))
            .await?;

        Ok(state)
    }

    /// Consume a state token from the callback, returning the tenant it was
    /// bound to. Unknown, expired and replayed states are indistinguishable.
    pub async fn consume(&self, state: &str) -> Result<Option<Uuid>, AuthError> {
        let value = self
            .tickets
            .take_once(&state_key(state))
            .await?
            .ok_or(AuthError::InvalidOAuthState)?;

        if value == "none" {
            return Ok(None);
        }
        value
            .parse()
            .map(Some)
            .map_err(|_| AuthError::InvalidOAuthState)
    }
}

pub struct OAuthIdentityResolver {
    identities: Arc<dyn IdentityStore>,
    links: Arc<dyn OAuthLinkStore>,
    codec: Arc<TokenCodec>,
    sessions: Arc<SessionManager>,
    session_ttl_seconds: i64,
}

impl OAuthIdentityResolver {
    pub fn new(
        config: &EngineConfig,
        identities: Arc<dyn IdentityStore>,
        links: Arc<dyn OAuthLinkStore>,
        codec: Arc<TokenCodec>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            identities,
            links,
            codec,
            sessions,
            session_ttl_seconds: config.refresh_token_expiry_seconds(),
        }
    }

    /// Map a provider profile onto an identity.
    ///
    /// Three cases, checked in order: an existing link for this
    /// (provider, provider_user_id) pair, an existing identity with the same
    /// email to link a new provider onto, or a brand new identity. Returns
    /// the identity and whether it was just created.
    pub async fn resolve(&self, profile: &ProviderProfile) -> Result<(Identity, bool), AuthError> {
        if let Some(mut link) = self
            .links
            .find_by_provider(&profile.provider, &profile.provider_user_id)
            .await?
        {
            // Provider tokens rotate on every login; keep the snapshot fresh.
            link.tokens = profile.tokens.clone();
            link.provider_email = Some(profile.email.clone());
            link.provider_avatar_url = profile.avatar_url.clone();
            link.updated_at = chrono::Utc::now();
            self.links.update(&link).await?;

            let identity = self
                .identities
                .find_by_id(link.identity_id)
                .await?
                .ok_or(AuthError::IdentityNotFound)?;
            tracing::info!(
                provider = %profile.provider,
                identity_id = %identity.id,
                "OAuth login for linked identity"
            );
            return Ok((identity, false));
        }

        if let Some(identity) = self.identities.find_by_email(&profile.email).await? {
            let link = OAuthLink::new(identity.id, profile);
            self.links.insert(&link).await?;
            self.identities
                .append_auth_method(identity.id, &profile.provider)
                .await?;
            tracing::info!(
                provider = %profile.provider,
                identity_id = %identity.id,
                "Linked new provider to existing identity"
            );
            return Ok((identity, false));
        }

        // Provider already verified the email, so the account starts active.
        let mut identity = Identity::new(profile.email.clone(), None);
        identity.first_name = profile.first_name.clone();
        identity.last_name = profile.last_name.clone();
        identity.avatar_url = profile.avatar_url.clone();
        identity.status = IdentityStatus::Active;
        identity.auth_methods = vec![profile.provider.clone()];
        self.identities.insert(&identity).await?;

        let link = OAuthLink::new(identity.id, profile);
        self.links.insert(&link).await?;
        tracing::info!(
            provider = %profile.provider,
            identity_id = %identity.id,
            "Created identity from provider profile"
        );
        Ok((identity, true))
    }

    /// Resolve the profile and finish the login with a session and tokens.
    pub async fn login(
        &self,
        profile: &ProviderProfile,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<(TokenPair, Identity, bool), AuthError> {
        let (identity, is_new) = self.resolve(profile).await?;
        if !identity.is_active() {
            return Err(AuthError::AccountNotActive);
        }

        let session = self
            .sessions
            .create(
                identity.id,
                ip_address,
                user_agent,
                Duration::from_secs(self.session_ttl_seconds.max(0) as u64),
            )
            .await?;
        let pair = TokenPair::issue(&self.codec, &identity, &session.session_id, &profile.provider)?;
        Ok((pair, identity, is_new))
    }
}
