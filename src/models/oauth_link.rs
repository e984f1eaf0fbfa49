//! OAuth link model - maps an external provider account to a local identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provider tokens cached on the link. They may rotate on every re-login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// (provider, provider_user_id) is unique; one link resolves to exactly one
/// identity. Created and updated only by the identity resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthLink {
    pub id: Uuid,
    pub identity_id: Uuid,
    pub provider: String,
    pub provider_user_id: String,
    pub tokens: ProviderTokens,
    pub provider_email: Option<String>,
    pub provider_avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OAuthLink {
    pub fn new(identity_id: Uuid, profile: &ProviderProfile) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            identity_id,
            provider: profile.provider.clone(),
            provider_user_id: profile.provider_user_id.clone(),
            tokens: profile.tokens.clone(),
            provider_email: Some(profile.email.clone()),
            provider_avatar_url: profile.avatar_url.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Normalized profile handed over by a provider strategy after the callback
/// exchange. Callers must have already resolved a usable email before
/// invoking the resolver; providers that mark the primary email private are
/// handled upstream via their secondary email endpoint.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub provider: String,
    pub provider_user_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub tokens: ProviderTokens,
}
