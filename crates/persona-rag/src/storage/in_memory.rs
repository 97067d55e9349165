//! Process-local storage backend

use super::Memory;
use crate::error::RagResult;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Writes between sweeps of expired entries
const SWEEP_INTERVAL: u64 = 256;

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }
}

/// In-memory storage with lazy TTL expiry
///
/// Expired entries are dropped when they are next read, and every
/// `SWEEP_INTERVAL` writes a sweep drops expired keys nobody reads again.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    entries: DashMap<String, Entry>,
    writes: AtomicU64,
}

impl InMemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including ones that expired but were not read since
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }
}

#[async_trait::async_trait]
impl Memory for InMemoryStorage {
    async fn set_with_ttl(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> RagResult<()> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });

        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL == 0 {
            let purged = self.purge_expired();
            if purged > 0 {
                debug!(purged, "Swept expired entries");
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> RagResult<Option<Value>> {
        let now = Instant::now();
        match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
        }

        // Read guard is released above; safe to take the write lock.
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    async fn delete(&self, key: &str) -> RagResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn backend_name(&self) -> &str {
        "in_memory"
    }
}
