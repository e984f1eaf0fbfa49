//! Revocation registry - blacklisted token ids and the live-session index.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::error::AuthError;
use crate::models::Session;
use crate::services::tickets::TicketStore;
use crate::services::token::Claims;

fn blacklist_key(jti: &str) -> String {
    format!("blacklist:{}", jti)
}

#[derive(Clone)]
pub struct RevocationRegistry {
    tickets: Arc<dyn TicketStore>,
}

impl RevocationRegistry {
    pub fn new(tickets: Arc<dyn TicketStore>) -> Self {
        Self { tickets }
    }

    /// Mark a token id dead until its natural expiry.
    pub async fn blacklist(&self, jti: &str, ttl: Duration) -> Result<(), AuthError> {
        self.tickets
            .put(&blacklist_key(jti), "revoked", ttl)
            .await?;
        tracing::debug!(jti = %jti, "Token blacklisted");
        Ok(())
    }

    pub async fn is_blacklisted(&self, jti: &str) -> Result<bool, AuthError> {
        self.tickets.exists(&blacklist_key(jti)).await
    }

    pub async fn has_live_session(
        &self,
        identity_id: Uuid,
        session_id: &str,
    ) -> Result<bool, AuthError> {
        self.tickets
            .exists(&Session::key(identity_id, session_id))
            .await
    }

    /// A token is revoked if its id is blacklisted or its backing session no
    /// longer exists.
    pub async fn is_revoked(&self, claims: &Claims) -> Result<bool, AuthError> {
        if self.is_blacklisted(&claims.jti).await? {
            return Ok(true);
        }
        if let Some(sid) = &claims.sid {
            let identity_id = claims.identity_id()?;
            if !self.has_live_session(identity_id, sid).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
