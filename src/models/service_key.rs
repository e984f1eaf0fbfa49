//! Service key model - the credential presented by backends calling the
//! introspection boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Stored as a SHA-256 hash only; the raw value is handed to the service
/// once at creation and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceKey {
    pub id: Uuid,
    pub name: String,
    pub key_hash: String,
    /// When set, introspection results are silently clamped to this tenant
    /// regardless of what the caller requests.
    pub tenant_id: Option<Uuid>,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ServiceKey {
    pub fn new(name: String, raw_key: &str, tenant_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            key_hash: Self::hash_key(raw_key),
            tenant_id,
            active: true,
            expires_at: None,
            last_used_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn hash_key(raw_key: &str) -> String {
        hex::encode(Sha256::digest(raw_key.as_bytes()))
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.map_or(true, |exp| exp > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn hash_is_stable_and_hex() {
        let h1 = ServiceKey::hash_key("svc_abc123");
        let h2 = ServiceKey::hash_key("svc_abc123");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, ServiceKey::hash_key("svc_abc124"));
    }

    #[test]
    fn expired_or_inactive_keys_are_unusable() {
        let mut key = ServiceKey::new("billing".to_string(), "svc_raw", None);
        let now = Utc::now();
        assert!(key.is_usable(now));

        key.expires_at = Some(now - Duration::minutes(1));
        assert!(!key.is_usable(now));

        key.expires_at = None;
        key.active = false;
        assert!(!key.is_usable(now));
    }
}
