//! Redis storage backend

use super::Memory;
use crate::error::{RagError, RagResult};
use redis::aio::ConnectionManager;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

/// Redis-backed storage
///
/// Values are stored as UTF-8 JSON strings; TTLs map to `SETEX`.
#[derive(Clone)]
pub struct RedisStorage {
    connection: ConnectionManager,
}

impl RedisStorage {
    /// Connect to `url`, e.g. `redis://localhost:6379`
    pub async fn connect(url: &str) -> RagResult<Self> {
        let client =
            redis::Client::open(url).map_err(|e| RagError::storage("redis_open", e))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| RagError::storage("redis_connect", e))?;

        info!(url = %url, "Connected to redis");

        Ok(Self { connection })
    }
}

#[async_trait::async_trait]
impl Memory for RedisStorage {
    async fn set_with_ttl(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> RagResult<()> {
        let payload =
            serde_json::to_string(&value).map_err(|e| RagError::storage("redis_encode", e))?;
        let mut conn = self.connection.clone();

        let cmd = match ttl {
            Some(ttl) => {
                let mut cmd = redis::cmd("SETEX");
                cmd.arg(key).arg(ttl.as_secs().max(1)).arg(payload);
                cmd
            }
            None => {
                let mut cmd = redis::cmd("SET");
                cmd.arg(key).arg(payload);
                cmd
            }
        };

        cmd.query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| RagError::storage("redis_set", e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> RagResult<Option<Value>> {
        let mut conn = self.connection.clone();
        let payload: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| RagError::storage("redis_get", e))?;

        payload
            .map(|raw| serde_json::from_str(&raw).map_err(|e| RagError::storage("redis_decode", e)))
            .transpose()
    }

    async fn delete(&self, key: &str) -> RagResult<bool> {
        let mut conn = self.connection.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| RagError::storage("redis_del", e))?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> RagResult<bool> {
        let mut conn = self.connection.clone();
        let found: i64 = redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| RagError::storage("redis_exists", e))?;
        Ok(found > 0)
    }

    fn backend_name(&self) -> &str {
        "redis"
    }
}
