//! Identity model - the account record the engine authenticates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStatus {
    Active,
    Inactive,
    Suspended,
    PendingVerification,
}

/// An authenticated principal. Password hash is absent for OAuth-only
/// accounts; the MFA secret is stored encrypted and only once enrolled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub status: IdentityStatus,
    /// Names of the auth methods this identity has used (password, magic_link,
    /// TOTP, provider names). Append-only from the engine's point of view.
    pub auth_methods: Vec<String>,
    pub mfa_enabled: bool,
    /// AES-256-GCM ciphertext of the TOTP secret, base64-encoded.
    pub mfa_secret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(email: String, password_hash: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            first_name: None,
            last_name: None,
            avatar_url: None,
            status: IdentityStatus::PendingVerification,
            auth_methods: Vec::new(),
            mfa_enabled: false,
            mfa_secret: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == IdentityStatus::Active
    }
}
