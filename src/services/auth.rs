//! Password login, token refresh and logout.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::AuthError;
use crate::models::{Identity, IdentityStatus};
use crate::services::mfa::MfaChallengeFlow;
use crate::services::revocation::RevocationRegistry;
use crate::services::session::SessionManager;
use crate::services::token::{TokenCodec, TokenKind};
use crate::store::IdentityStore;
use crate::utils::password::{hash_password, verify_password, Password};

/// The bearer token pair handed to a fully authenticated client.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl TokenPair {
    pub fn issue(
        codec: &TokenCodec,
        identity: &Identity,
        session_id: &str,
        method: &str,
    ) -> Result<Self, AuthError> {
        let (access_token, claims) = codec.issue_access(identity.id, session_id, method)?;
        let (refresh_token, _) = codec.issue_refresh(identity.id, session_id, method)?;
        Ok(Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: claims.remaining_seconds(),
        })
    }
}

/// Result of a credential check: either tokens, or a half-open door that the
/// MFA challenge flow must close.
#[derive(Debug)]
pub enum LoginOutcome {
    Tokens(TokenPair),
    MfaRequired { mfa_pending_token: String },
}

pub struct AuthService {
    identities: Arc<dyn IdentityStore>,
    codec: Arc<TokenCodec>,
    sessions: Arc<SessionManager>,
    revocations: Arc<RevocationRegistry>,
    mfa: Arc<MfaChallengeFlow>,
    session_ttl_seconds: i64,
}

impl AuthService {
    pub fn new(
        config: &EngineConfig,
        identities: Arc<dyn IdentityStore>,
        codec: Arc<TokenCodec>,
        sessions: Arc<SessionManager>,
        revocations: Arc<RevocationRegistry>,
        mfa: Arc<MfaChallengeFlow>,
    ) -> Self {
        Self {
            identities,
            codec,
            sessions,
            revocations,
            mfa,
            session_ttl_seconds: config.refresh_token_expiry_seconds(),
        }
    }

    /// Register a password identity. The account starts pending verification
    /// and cannot log in until activated.
    pub async fn register(
        &self,
        email: &str,
        password: &Password,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<Identity, AuthError> {
        if self.identities.find_by_email(email).await?.is_some() {
            return Err(AuthError::EmailAlreadyRegistered);
        }

        let mut identity = Identity::new(email.to_string(), Some(hash_password(password)?));
        identity.first_name = first_name;
        identity.last_name = last_name;
        identity.auth_methods = vec!["password".to_string()];

        self.identities.insert(&identity).await?;
        tracing::info!(identity_id = %identity.id, "Identity registered");
        Ok(identity)
    }

    /// Check email and password. Missing account, missing password hash and
    /// wrong password are indistinguishable to the caller.
    pub async fn login(
        &self,
        email: &str,
        password: &Password,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<LoginOutcome, AuthError> {
        let identity = self
            .identities
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = identity
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, hash).map_err(|_| AuthError::InvalidCredentials)?;

        if identity.status != IdentityStatus::Active {
            return Err(AuthError::AccountNotActive);
        }

        if identity.mfa_enabled {
            let mfa_pending_token = self.mfa.begin(&identity, ip_address, user_agent).await?;
            tracing::info!(identity_id = %identity.id, "Login pending MFA");
            return Ok(LoginOutcome::MfaRequired { mfa_pending_token });
        }

        let session = self
            .sessions
            .create(identity.id, ip_address, user_agent, self.session_ttl())
            .await?;
        let pair = TokenPair::issue(&self.codec, &identity, &session.session_id, "password")?;
        tracing::info!(identity_id = %identity.id, "Password login succeeded");
        Ok(LoginOutcome::Tokens(pair))
    }

    /// Exchange a live refresh token for a fresh pair bound to the same
    /// session. The old refresh token is blacklisted for its remaining
    /// lifetime so each one is spendable once.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.codec.verify_kind(refresh_token, TokenKind::Refresh)?;

        if self.revocations.is_revoked(&claims).await? {
            return Err(AuthError::TokenRevoked);
        }

        let identity = self
            .identities
            .find_by_id(claims.identity_id()?)
            .await?
            .ok_or(AuthError::IdentityNotFound)?;
        if !identity.is_active() {
            return Err(AuthError::AccountNotActive);
        }

        let session_id = claims.sid.clone().ok_or(AuthError::TokenMalformed)?;

        let remaining = claims.remaining_seconds().max(1);
        self.revocations
            .blacklist(&claims.jti, Duration::from_secs(remaining as u64))
            .await?;

        let method = claims.method.as_deref().unwrap_or("password");
        TokenPair::issue(&self.codec, &identity, &session_id, method)
    }

    /// Revoke both the presented access token and its session.
    pub async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        let claims = self.codec.verify_kind(access_token, TokenKind::Access)?;

        let remaining = claims.remaining_seconds().max(1);
        self.revocations
            .blacklist(&claims.jti, Duration::from_secs(remaining as u64))
            .await?;

        if let Some(session_id) = &claims.sid {
            self.sessions
                .revoke(claims.identity_id()?, session_id)
                .await?;
        }

        tracing::info!(jti = %claims.jti, "Logged out");
        Ok(())
    }

    fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds.max(0) as u64)
    }
}
