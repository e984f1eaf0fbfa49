//! TOTP enrollment and the second factor of login.
//!
//! A password check against an MFA-enabled account does not create a session.
//! It parks the login context in a single-use pending ticket; only a valid
//! authenticator code within the pending window turns that into tokens. The
//! shared secret is stored encrypted and only decrypted at verification time.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::AuthError;
use crate::models::Identity;
use crate::services::session::SessionManager;
use crate::services::tickets::TicketStore;
use crate::services::token::{TokenCodec, TokenKind};
use crate::store::IdentityStore;
use crate::utils::crypto::SecretCipher;
use crate::utils::totp;

use super::auth::TokenPair;

/// Accept one time step of clock drift either side of now.
const TOTP_DRIFT_STEPS: u64 = 1;

fn pending_key(identity_id: Uuid) -> String {
    format!("mfa_pending:{}", identity_id)
}

#[derive(Debug, Serialize, Deserialize)]
struct PendingContext {
    jti: String,
    ip_address: String,
    user_agent: String,
}

/// Secret and provisioning URI handed back when enrollment begins. The raw
/// secret is shown to the user exactly once.
#[derive(Debug, Serialize)]
pub struct EnrollmentStart {
    pub secret: String,
    pub provisioning_uri: String,
}

pub struct MfaChallengeFlow {
    identities: Arc<dyn IdentityStore>,
    tickets: Arc<dyn TicketStore>,
    codec: Arc<TokenCodec>,
    sessions: Arc<SessionManager>,
    cipher: SecretCipher,
    issuer: String,
    pending_ttl_seconds: u64,
    session_ttl_seconds: i64,
}

impl MfaChallengeFlow {
    pub fn new(
        config: &EngineConfig,
        identities: Arc<dyn IdentityStore>,
        tickets: Arc<dyn TicketStore>,
        codec: Arc<TokenCodec>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            identities,
            tickets,
            codec,
            sessions,
            cipher: SecretCipher::new(&config.token_secret),
            issuer: config.token_issuer.clone(),
            pending_ttl_seconds: config.mfa_pending_ttl_seconds,
            session_ttl_seconds: config.refresh_token_expiry_seconds(),
        }
    }

    /// Park a half-finished login and return the pending token the client
    /// must present together with an authenticator code.
    pub async fn begin(
        &self,
        identity: &Identity,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<String, AuthError> {
        let (token, claims) = self
            .codec
            .issue_mfa_pending(identity.id, self.pending_ttl_seconds)?;

        let context = PendingContext {
            jti: claims.jti,
            ip_address: ip_address.to_string(),
            user_agent: user_agent.to_string(),
        };
        let value = serde_json::to_string(&context)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("pending context encoding: {}", e)))?;

        self.tickets
            .put(
                &pending_key(identity.id),
                &value,
                Duration::from_secs(self.pending_ttl_seconds),
            )
            .await?;

        Ok(token)
    }

    /// Redeem the pending ticket with an authenticator code. A wrong code
    /// consumes the ticket; the client must restart from the password step.
    pub async fn complete(
        &self,
        pending_token: &str,
        code: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<TokenPair, AuthError> {
        let claims = self
            .codec
            .verify_kind(pending_token, TokenKind::MfaPending)?;
        let identity_id = claims.identity_id()?;

        let raw = self
            .tickets
            .take_once(&pending_key(identity_id))
            .await?
            .ok_or(AuthError::ChallengeExpiredOrConsumed)?;
        let context: PendingContext = serde_json::from_str(&raw)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("pending context decoding: {}", e)))?;

        let identity = self
            .identities
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthError::IdentityNotFound)?;
        if !identity.is_active() {
            return Err(AuthError::AccountNotActive);
        }

        self.check_code(&identity, code)?;

        let session = self
            .sessions
            .create(
                identity.id,
                ip_address.unwrap_or(&context.ip_address),
                user_agent.unwrap_or(&context.user_agent),
                Duration::from_secs(self.session_ttl_seconds.max(0) as u64),
            )
            .await?;

        let pair = TokenPair::issue(&self.codec, &identity, &session.session_id, "totp")?;
        self.identities
            .append_auth_method(identity.id, "totp")
            .await?;
        tracing::info!(identity_id = %identity.id, "MFA login succeeded");
        Ok(pair)
    }

    /// Generate and store a new encrypted secret. MFA stays disabled until
    /// the first code is confirmed.
    pub async fn begin_enrollment(&self, identity_id: Uuid) -> Result<EnrollmentStart, AuthError> {
        let identity = self.load(identity_id).await?;
        if identity.mfa_enabled {
            return Err(AuthError::MfaAlreadyEnabled);
        }

        let secret = totp::generate_secret();
        let encrypted = self.cipher.encrypt(&secret)?;
        self.identities
            .set_mfa(identity.id, false, Some(encrypted))
            .await?;

        Ok(EnrollmentStart {
            provisioning_uri: totp::provisioning_uri(&secret, &identity.email, &self.issuer),
            secret,
        })
    }

    /// Flip MFA on once the user proves their authenticator produces valid
    /// codes for the stored secret.
    pub async fn confirm_enrollment(&self, identity_id: Uuid, code: &str) -> Result<(), AuthError> {
        let identity = self.load(identity_id).await?;
        if identity.mfa_enabled {
            return Err(AuthError::MfaAlreadyEnabled);
        }
        if identity.mfa_secret.is_none() {
            return Err(AuthError::MfaNotEnrolled);
        }

        self.check_code(&identity, code)?;

        let encrypted = identity.mfa_secret.clone();
        self.identities.set_mfa(identity.id, true, encrypted).await?;
        tracing::info!(identity_id = %identity.id, "MFA enabled");
        Ok(())
    }

    /// Disable MFA after a final valid code, discarding the secret.
    pub async fn disable(&self, identity_id: Uuid, code: &str) -> Result<(), AuthError> {
        let identity = self.load(identity_id).await?;
        if !identity.mfa_enabled {
            return Err(AuthError::MfaNotEnrolled);
        }

        self.check_code(&identity, code)?;

        self.identities.set_mfa(identity.id, false, None).await?;
        tracing::info!(identity_id = %identity.id, "MFA disabled");
        Ok(())
    }

    fn check_code(&self, identity: &Identity, code: &str) -> Result<(), AuthError> {
        let encrypted = identity
            .mfa_secret
            .as_deref()
            .ok_or(AuthError::MfaNotEnrolled)?;
        let secret = self.cipher.decrypt(encrypted)?;
        if !totp::verify(&secret, code, TOTP_DRIFT_STEPS) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Identity, AuthError> {
        self.identities
            .find_by_id(id)
            .await?
            .ok_or(AuthError::IdentityNotFound)
    }
}
