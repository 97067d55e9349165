//! # Key-value storage backends
//!
//! Every piece of mutable pipeline state (cached answers, session history)
//! lives behind the [`Memory`] trait. Values are JSON documents and each write
//! carries an optional time-to-live; reads of expired keys behave like misses.
//!
//! Keys are namespaced with `::` separators, e.g.
//! `session::<session_id>::history` or `answer::<sha256>`.
//!
//! - [`InMemoryStorage`]: process-local, default
//! - `RedisStorage`: shared Redis backend (feature `redis`)

mod in_memory;
#[cfg(feature = "redis")]
mod redis;

pub use in_memory::InMemoryStorage;
#[cfg(feature = "redis")]
pub use self::redis::RedisStorage;

use crate::error::RagResult;
use serde_json::Value;
use std::time::Duration;

/// Async key-value store with per-key TTL
///
/// Single-key reads and writes are atomic; no cross-key transactions exist.
#[async_trait::async_trait]
pub trait Memory: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl` when given
    async fn set_with_ttl(&self, key: &str, value: Value, ttl: Option<Duration>)
        -> RagResult<()>;

    /// Fetch the value under `key`, `None` when absent or expired
    async fn get(&self, key: &str) -> RagResult<Option<Value>>;

    /// Remove `key`, returning whether it existed
    async fn delete(&self, key: &str) -> RagResult<bool>;

    /// Whether a live value exists under `key`
    async fn exists(&self, key: &str) -> RagResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Short backend identifier for logs
    fn backend_name(&self) -> &str;
}
