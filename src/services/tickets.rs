//! Ephemeral ticket store.
//!
//! Every single-use flow in the engine (magic links, MFA challenges, OAuth
//! state) is built exclusively on [`TicketStore::take_once`], which must
//! return the current value and delete the key in one indivisible store
//! operation. A separate get followed by a delete reintroduces the replay
//! race this store exists to remove.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};

use crate::error::AuthError;

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AuthError>;
    async fn get(&self, key: &str) -> Result<Option<String>, AuthError>;
    /// Atomically read and delete. Of N concurrent calls for the same key,
    /// exactly one observes the value; the rest observe absence.
    async fn take_once(&self, key: &str) -> Result<Option<String>, AuthError>;
    async fn exists(&self, key: &str) -> Result<bool, AuthError>;
    async fn delete(&self, key: &str) -> Result<(), AuthError>;
    /// Keys matching a glob pattern. Used only for per-identity session
    /// enumeration, where the key population is bounded by the session cap.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, AuthError>;
}

/// Redis-backed ticket store.
#[derive(Clone)]
pub struct RedisTicketStore {
    manager: ConnectionManager,
}

impl RedisTicketStore {
    pub async fn connect(url: &str) -> Result<Self, AuthError> {
        tracing::info!(url = %url, "Connecting to ticket store");
        let client = Client::open(url)?;
        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to get ticket store connection manager");
            AuthError::TicketStore(e)
        })?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl TicketStore for RedisTicketStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AuthError> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(AuthError::TicketStore)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let mut conn = self.manager.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(AuthError::TicketStore)
    }

    async fn take_once(&self, key: &str) -> Result<Option<String>, AuthError> {
        // GETDEL is the single round trip that makes single-use safe under
        // concurrent redemption across engine instances.
        let mut conn = self.manager.clone();
        redis::cmd("GETDEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(AuthError::TicketStore)
    }

    async fn exists(&self, key: &str) -> Result<bool, AuthError> {
        let mut conn = self.manager.clone();
        redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(AuthError::TicketStore)
    }

    async fn delete(&self, key: &str) -> Result<(), AuthError> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(AuthError::TicketStore)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, AuthError> {
        let mut conn = self.manager.clone();
        redis::cmd("KEYS")
            .arg(pattern)
            .query_async(&mut conn)
            .await
            .map_err(AuthError::TicketStore)
    }
}

/// In-memory ticket store for tests and local development. A single mutex
/// makes `take_once` atomic; TTLs are enforced lazily on read.
#[derive(Default)]
pub struct MemoryTicketStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>>, AuthError>
    {
        self.entries
            .lock()
            .map_err(|_| AuthError::Store(anyhow::anyhow!("ticket store mutex poisoned")))
    }
}

fn is_live(deadline: Instant) -> bool {
    Instant::now() < deadline
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AuthError> {
        let mut entries = self.lock()?;
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some((value, deadline)) if is_live(*deadline) => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn take_once(&self, key: &str) -> Result<Option<String>, AuthError> {
        let mut entries = self.lock()?;
        match entries.remove(key) {
            Some((value, deadline)) if is_live(deadline) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, AuthError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn delete(&self, key: &str) -> Result<(), AuthError> {
        let mut entries = self.lock()?;
        entries.remove(key);
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, AuthError> {
        // Only the trailing-star form is used by the engine.
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        let entries = self.lock()?;
        Ok(entries
            .iter()
            .filter(|(key, (_, deadline))| key.starts_with(prefix) && is_live(*deadline))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
