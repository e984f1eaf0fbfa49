//! Passwordless email login.
//!
//! A request mints a short-lived signed token and a matching pending ticket
//! keyed by the token's jti. Verification consumes the ticket atomically, so
//! a link works exactly once no matter how many times it is clicked.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::AuthError;
use crate::models::Identity;
use crate::services::session::SessionManager;
use crate::services::tickets::TicketStore;
use crate::services::token::{TokenCodec, TokenKind};
use crate::store::IdentityStore;

use super::auth::TokenPair;

fn magic_key(jti: &str) -> String {
    format!("magic:{}", jti)
}

/// Delivery of the magic link to the identity's mailbox. Dispatch itself is
/// owned outside this crate.
#[async_trait]
pub trait MagicLinkSender: Send + Sync {
    async fn send(&self, email: &str, token: &str) -> Result<(), AuthError>;
}

/// Logs the link instead of sending it. For local development only.
pub struct ConsoleMagicLinkSender;

#[async_trait]
impl MagicLinkSender for ConsoleMagicLinkSender {
    async fn send(&self, email: &str, token: &str) -> Result<(), AuthError> {
        tracing::info!(email = %email, token = %token, "Magic link issued (console delivery)");
        Ok(())
    }
}

pub struct MagicLinkFlow {
    identities: Arc<dyn IdentityStore>,
    tickets: Arc<dyn TicketStore>,
    codec: Arc<TokenCodec>,
    sessions: Arc<SessionManager>,
    sender: Arc<dyn MagicLinkSender>,
    ttl_seconds: u64,
    session_ttl_seconds: i64,
}

impl MagicLinkFlow {
    pub fn new(
        config: &EngineConfig,
        identities: Arc<dyn IdentityStore>,
        tickets: Arc<dyn TicketStore>,
        codec: Arc<TokenCodec>,
        sessions: Arc<SessionManager>,
        sender: Arc<dyn MagicLinkSender>,
    ) -> Self {
        Self {
            identities,
            tickets,
            codec,
            sessions,
            sender,
            ttl_seconds: config.magic_link_ttl_seconds,
            // Sessions outlive access tokens; they bound refresh reuse.
            session_ttl_seconds: config.refresh_token_expiry_seconds(),
        }
    }

    /// Request a magic link for an email address.
    ///
    /// Returns Ok whether or not the address maps to a usable account, so the
    /// response cannot be used to enumerate registered emails. The pending
    /// ticket is written before delivery is attempted; if delivery fails the
    /// ticket is rolled back so the undeliverable token is never redeemable.
    pub async fn request(&self, email: &str) -> Result<(), AuthError> {
        let identity = match self.identities.find_by_email(email).await? {
            Some(identity) if identity.is_active() => identity,
            Some(_) => {
                tracing::warn!(email = %email, "Magic link requested for non-active account");
                return Ok(());
            }
            None => {
                tracing::warn!(email = %email, "Magic link requested for unknown email");
                return Ok(());
            }
        };

        let (token, claims) = self.codec.issue_magic_link(identity.id, self.ttl_seconds)?;

        self.tickets
            .put(
                &magic_key(&claims.jti),
                "pending",
                Duration::from_secs(self.ttl_seconds),
            )
            .await?;

        if let Err(e) = self.sender.send(&identity.email, &token).await {
            // Roll back so the link can't be redeemed if it somehow reached
            // the user anyway.
            self.tickets.delete(&magic_key(&claims.jti)).await?;
            tracing::error!(identity_id = %identity.id, error = %e, "Magic link delivery failed");
            return Err(AuthError::Delivery(e.to_string()));
        }

        tracing::info!(identity_id = %identity.id, jti = %claims.jti, "Magic link sent");
        Ok(())
    }

    /// Redeem a magic link token, establishing a session and a token pair.
    pub async fn verify(
        &self,
        token: &str,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<TokenPair, AuthError> {
        let claims = self.codec.verify_kind(token, TokenKind::MagicLink)?;

        if self.tickets.take_once(&magic_key(&claims.jti)).await?.is_none() {
            return Err(AuthError::ChallengeExpiredOrConsumed);
        }

        let identity = self.load_active(claims.identity_id()?).await?;

        self.identities
            .append_auth_method(identity.id, "magic_link")
            .await?;

        let session = self
            .sessions
            .create(
                identity.id,
                ip_address,
                user_agent,
                Duration::from_secs(self.session_ttl_seconds.max(0) as u64),
            )
            .await?;

        let pair = TokenPair::issue(&self.codec, &identity, &session.session_id, "magic_link")?;
        tracing::info!(identity_id = %identity.id, "Magic link login succeeded");
        Ok(pair)
    }

    async fn load_active(&self, id: Uuid) -> Result<Identity, AuthError> {
        let identity = self
            .identities
            .find_by_id(id)
            .await?
            .ok_or(AuthError::IdentityNotFound)?;
        if !identity.is_active() {
            return Err(AuthError::AccountNotActive);
        }
        Ok(identity)
    }
}
