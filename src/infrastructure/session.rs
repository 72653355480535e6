//! Server-held session state: cart, checkout progress and wizard draft.
//!
//! Entries expire `ttl` after their last write. Expired entries are dropped
//! lazily on access and by [`SessionStore::purge_expired`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::domain::aggregates::{Cart, Checkout, ProductDraft};

#[derive(Clone, Debug, Default)]
pub struct SessionData {
    pub cart: Option<Cart>,
    pub checkout: Option<Checkout>,
    pub wizard: Option<ProductDraft>,
}

struct Entry {
    data: SessionData,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct SessionStore {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// A copy of the session, if it exists and has not expired.
    pub async fn get(&self, key: &str) -> Option<SessionData> {
        let entries = self.entries.read().await;
        entries.get(key).filter(|e| e.expires_at > Instant::now()).map(|e| e.data.clone())
    }

    /// Runs `f` on the session, creating it if needed, and refreshes its expiry.
    pub async fn update<T>(&self, key: &str, f: impl FnOnce(&mut SessionData) -> T) -> T {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry { data: SessionData::default(), expires_at: now });
        if entry.expires_at <= now {
            tracing::debug!(session = key, "session expired, starting fresh");
            entry.data = SessionData::default();
        }
        let out = f(&mut entry.data);
        entry.expires_at = now + self.ttl;
        out
    }

    pub async fn remove(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }
}
