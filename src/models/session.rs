//! Session record stored as a JSON ticket under `session:{identity}:{sid}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub identity_id: Uuid,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn key(identity_id: Uuid, session_id: &str) -> String {
        format!("session:{}:{}", identity_id, session_id)
    }
}
