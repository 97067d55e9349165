//! Typed TTL cache over a storage backend

use crate::error::{RagError, RagResult};
use crate::storage::Memory;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// JSON cache with per-write TTL
///
/// Thin typed facade over [`Memory`]; repositories build their key
/// namespaces on top of it.
#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<dyn Memory>,
}

impl CacheStore {
    /// Wrap a storage backend
    pub fn new(storage: Arc<dyn Memory>) -> Self {
        Self { storage }
    }

    /// Serialize `value` and store it under `key` for `ttl`
    pub async fn save<T: Serialize + ?Sized>(
        &self,
        key: &str,
        ttl: Duration,
        value: &T,
    ) -> RagResult<()> {
        let json = serde_json::to_value(value).map_err(|e| RagError::storage("cache_encode", e))?;
        self.storage.set_with_ttl(key, json, Some(ttl)).await
    }

    /// Load and deserialize the value under `key`
    ///
    /// Absent or expired keys yield `None`; a stored value of the wrong shape
    /// is an error.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> RagResult<Option<T>> {
        match self.storage.get(key).await? {
            None => Ok(None),
            Some(json) => serde_json::from_value(json)
                .map(Some)
                .map_err(|e| RagError::storage("cache_decode", e)),
        }
    }

    /// Remove the value under `key`
    pub async fn delete(&self, key: &str) -> RagResult<bool> {
        self.storage.delete(key).await
    }

    /// Backend identifier for logs
    pub fn backend_name(&self) -> &str {
        self.storage.backend_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    #[tokio::test]
    async fn test_save_and_get_typed_value() {
        let cache = CacheStore::new(Arc::new(InMemoryStorage::new()));
        let note = Note {
            text: "한글도 그대로".to_string(),
        };

        cache.save("note", Duration::from_secs(60), &note).await.unwrap();
        let loaded: Option<Note> = cache.get("note").await.unwrap();
        assert_eq!(loaded, Some(note));

        let missing: Option<Note> = cache.get("other").await.unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_wrong_shape_is_storage_error() {
        let cache = CacheStore::new(Arc::new(InMemoryStorage::new()));
        tokio_test::assert_ok!(tokio_test::block_on(cache.save(
            "note",
            Duration::from_secs(60),
            &42
        )));

        let err = tokio_test::assert_err!(tokio_test::block_on(cache.get::<Note>("note")));
        assert!(matches!(err, RagError::Storage { .. }));
    }

    #[test]
    fn test_delete_reports_presence() {
        let cache = CacheStore::new(Arc::new(InMemoryStorage::new()));
        tokio_test::block_on(async {
            cache.save("k", Duration::from_secs(60), "v").await.unwrap();
            assert!(tokio_test::assert_ok!(cache.delete("k").await));
            assert!(!tokio_test::assert_ok!(cache.delete("k").await));
        });
        assert_eq!(cache.backend_name(), "in_memory");
    }
}
