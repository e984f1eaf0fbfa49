//! Shared setup for the integration tests: an engine wired over the
//! in-memory stores with a capturing magic-link sender.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use auth_engine::config::EngineConfig;
use auth_engine::error::AuthError;
use auth_engine::models::{Identity, IdentityStatus};
use auth_engine::services::{MagicLinkSender, MemoryTicketStore};
use auth_engine::store::MemoryStore;
use auth_engine::utils::password::{hash_password, Password};
use auth_engine::{AuthEngine, EngineStores};

pub fn test_config() -> EngineConfig {
    EngineConfig {
        token_secret: "integration-test-secret-0123456789abcdef".to_string(),
        token_issuer: "auth-engine-test".to_string(),
        access_token_expiry_minutes: 30,
        refresh_token_expiry_days: 7,
        magic_link_ttl_seconds: 900,
        mfa_pending_ttl_seconds: 300,
        oauth_state_ttl_seconds: 600,
        max_concurrent_sessions: 5,
        redis_url: "redis://127.0.0.1:6379".to_string(),
        superadmin_email: "root@example.com".to_string(),
        superadmin_password: "super-secret-bootstrap".to_string(),
    }
}

/// Captures every send instead of delivering, and can be told to fail.
pub struct CapturingSender {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: Mutex<bool>,
}

impl CapturingSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: Mutex::new(false),
        })
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn last_token(&self) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .last()
            .map(|(_, token)| token.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MagicLinkSender for CapturingSender {
    async fn send(&self, email: &str, token: &str) -> Result<(), AuthError> {
        // Record even on failure so tests can prove a failed delivery's
        // token is dead.
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), token.to_string()));
        if *self.fail.lock().unwrap() {
            return Err(AuthError::Delivery("smtp unreachable".to_string()));
        }
        Ok(())
    }
}

pub struct TestHarness {
    pub engine: AuthEngine,
    pub store: Arc<MemoryStore>,
    pub tickets: Arc<MemoryTicketStore>,
    pub sender: Arc<CapturingSender>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn build_engine() -> TestHarness {
    build_engine_with_config(test_config())
}

pub fn build_engine_with_config(config: EngineConfig) -> TestHarness {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let tickets = Arc::new(MemoryTicketStore::new());
    let sender = CapturingSender::new();

    let stores = EngineStores {
        identities: store.clone(),
        rbac: store.clone(),
        oauth_links: store.clone(),
        service_keys: store.clone(),
        tickets: tickets.clone(),
    };
    let engine =
        AuthEngine::new(config, stores, sender.clone()).expect("engine construction failed");

    TestHarness {
        engine,
        store,
        tickets,
        sender,
    }
}

/// Insert an active identity with the given password and return it.
pub async fn seed_active_identity(store: &MemoryStore, email: &str, password: &str) -> Identity {
    let secret = Password::new(password.to_string());
    let mut identity = Identity::new(email.to_string(), Some(hash_password(&secret).unwrap()));
    identity.status = IdentityStatus::Active;
    identity.auth_methods = vec!["password".to_string()];

    use auth_engine::store::IdentityStore;
    store.insert(&identity).await.unwrap();
    identity
}
