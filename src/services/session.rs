//! Session manager - creation, listing, revocation and the concurrent
//! session cap.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::Session;
use crate::services::tickets::TicketStore;

#[derive(Clone)]
pub struct SessionManager {
    tickets: Arc<dyn TicketStore>,
    max_sessions: usize,
}

impl SessionManager {
    pub fn new(tickets: Arc<dyn TicketStore>, max_sessions: usize) -> Self {
        Self {
            tickets,
            max_sessions,
        }
    }

    /// Create a session, then evict the identity's oldest-created sessions
    /// until back at the cap. Eviction is a side effect of creation; there
    /// is no background job.
    pub async fn create(
        &self,
        identity_id: Uuid,
        ip_address: &str,
        user_agent: &str,
        ttl: Duration,
    ) -> Result<Session, AuthError> {
        let now = Utc::now();
        let session = Session {
            session_id: Uuid::new_v4().to_string(),
            identity_id,
            ip_address: ip_address.to_string(),
            user_agent: user_agent.to_string(),
            created_at: now,
            expires_at: now + chrono::Duration::seconds(ttl.as_secs() as i64),
        };

        let value = serde_json::to_string(&session)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("session encoding failed: {}", e)))?;
        self.tickets
            .put(&Session::key(identity_id, &session.session_id), &value, ttl)
            .await?;

        self.evict_over_cap(identity_id).await?;

        tracing::info!(
            identity_id = %identity_id,
            session_id = %session.session_id,
            "Session created"
        );
        Ok(session)
    }

    async fn evict_over_cap(&self, identity_id: Uuid) -> Result<(), AuthError> {
        let mut sessions = self.list_active(identity_id).await?;
        if sessions.len() <= self.max_sessions {
            return Ok(());
        }

        // list_active sorts newest first; everything past the cap is the
        // oldest-created tail.
        for stale in sessions.split_off(self.max_sessions) {
            self.tickets
                .delete(&Session::key(identity_id, &stale.session_id))
                .await?;
            tracing::info!(
                identity_id = %identity_id,
                session_id = %stale.session_id,
                "Evicted oldest session over concurrency cap"
            );
        }
        Ok(())
    }

    pub async fn get(
        &self,
        identity_id: Uuid,
        session_id: &str,
    ) -> Result<Option<Session>, AuthError> {
        let raw = self
            .tickets
            .get(&Session::key(identity_id, session_id))
            .await?;
        match raw {
            Some(json) => Ok(serde_json::from_str(&json).ok()),
            None => Ok(None),
        }
    }

    /// Delete the session record. Liveness checks anywhere in the system
    /// observe this immediately; there is one authoritative store.
    pub async fn revoke(&self, identity_id: Uuid, session_id: &str) -> Result<(), AuthError> {
        self.tickets
            .delete(&Session::key(identity_id, session_id))
            .await?;
        tracing::info!(identity_id = %identity_id, session_id = %session_id, "Session revoked");
        Ok(())
    }

    pub async fn revoke_all(&self, identity_id: Uuid) -> Result<(), AuthError> {
        for session in self.list_active(identity_id).await? {
            self.tickets
                .delete(&Session::key(identity_id, &session.session_id))
                .await?;
        }
        Ok(())
    }

    /// Live sessions for an identity, newest first.
    pub async fn list_active(&self, identity_id: Uuid) -> Result<Vec<Session>, AuthError> {
        let pattern = format!("session:{}:*", identity_id);
        let mut sessions = Vec::new();
        for key in self.tickets.keys(&pattern).await? {
            if let Some(json) = self.tickets.get(&key).await? {
                if let Ok(session) = serde_json::from_str::<Session>(&json) {
                    sessions.push(session);
                }
            }
        }
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }
}
