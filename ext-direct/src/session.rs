//! Session-scoped key/value persistence.
//!
//! The token issuer needs somewhere to pin the second token of the pair; it
//! goes through this trait so the host can back sessions however it already
//! does (server-side store, encrypted cookie, ...). Sessions are keyed by an
//! opaque id the router derives from the token cookie.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;

/// Opaque per-session key/value store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a session value.
    async fn get(&self, session: &str, key: &str) -> Option<String>;

    /// Write a session value.
    async fn set(&self, session: &str, key: &str, value: &str);
}

/// In-process session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, BTreeMap<String, String>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session: &str, key: &str) -> Option<String> {
        self.sessions
            .get(session)
            .and_then(|values| values.get(key).cloned())
    }

    async fn set(&self, session: &str, key: &str, value: &str) {
        self.sessions
            .entry(session.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }
}
