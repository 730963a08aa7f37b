//! Named cache storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::entry::CachedResponse;
use crate::error::{CacheError, CacheResult};
use crate::key::RequestKey;

/// Storage holding named caches, each mapping request identity to one response.
///
/// Single-key operations are atomic; concurrent writers to the same key
/// resolve last-write-wins.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the named cache if it does not exist.
    async fn open(&self, cache: &str) -> CacheResult<()>;

    /// Check whether the named cache exists.
    async fn has(&self, cache: &str) -> CacheResult<bool>;

    /// All cache names in creation order.
    async fn names(&self) -> CacheResult<Vec<String>>;

    /// Delete a cache and its entries. Returns whether it existed.
    async fn delete(&self, cache: &str) -> CacheResult<bool>;

    /// Look up a key in one cache.
    async fn get(&self, cache: &str, key: &RequestKey) -> CacheResult<Option<CachedResponse>>;

    /// Store a response, creating the cache on first use and replacing any previous entry.
    async fn put(&self, cache: &str, key: &RequestKey, response: CachedResponse) -> CacheResult<()>;

    /// Keys stored in one cache.
    async fn keys(&self, cache: &str) -> CacheResult<Vec<RequestKey>>;

    /// Look up a key across every cache in creation order.
    async fn match_any(&self, key: &RequestKey) -> CacheResult<Option<CachedResponse>> {
        for cache in self.names().await? {
            if let Some(found) = self.get(&cache, key).await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl<S: CacheStorage + ?Sized> CacheStorage for Arc<S> {
    async fn open(&self, cache: &str) -> CacheResult<()> {
        (**self).open(cache).await
    }

    async fn has(&self, cache: &str) -> CacheResult<bool> {
        (**self).has(cache).await
    }

    async fn names(&self) -> CacheResult<Vec<String>> {
        (**self).names().await
    }

    async fn delete(&self, cache: &str) -> CacheResult<bool> {
        (**self).delete(cache).await
    }

    async fn get(&self, cache: &str, key: &RequestKey) -> CacheResult<Option<CachedResponse>> {
        (**self).get(cache, key).await
    }

    async fn put(&self, cache: &str, key: &RequestKey, response: CachedResponse) -> CacheResult<()> {
        (**self).put(cache, key, response).await
    }

    async fn keys(&self, cache: &str) -> CacheResult<Vec<RequestKey>> {
        (**self).keys(cache).await
    }

    async fn match_any(&self, key: &RequestKey) -> CacheResult<Option<CachedResponse>> {
        (**self).match_any(key).await
    }
}

/// In-memory cache storage (for development/testing).
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: RwLock<Vec<(String, HashMap<RequestKey, CachedResponse>)>>,
    reject_writes: AtomicBool,
}

impl MemoryCacheStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail as if quota were exhausted.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, cache: &str) -> CacheResult<()> {
        let mut caches = self.caches.write().await;
        if !caches.iter().any(|(name, _)| name == cache) {
            caches.push((cache.to_string(), HashMap::new()));
        }
        Ok(())
    }

    async fn has(&self, cache: &str) -> CacheResult<bool> {
        Ok(self.caches.read().await.iter().any(|(name, _)| name == cache))
    }

    async fn names(&self) -> CacheResult<Vec<String>> {
        Ok(self
            .caches
            .read()
            .await
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn delete(&self, cache: &str) -> CacheResult<bool> {
        let mut caches = self.caches.write().await;
        let before = caches.len();
        caches.retain(|(name, _)| name != cache);
        Ok(caches.len() != before)
    }

    async fn get(&self, cache: &str, key: &RequestKey) -> CacheResult<Option<CachedResponse>> {
        Ok(self
            .caches
            .read()
            .await
            .iter()
            .find(|(name, _)| name == cache)
            .and_then(|(_, entries)| entries.get(key).cloned()))
    }

    async fn put(&self, cache: &str, key: &RequestKey, response: CachedResponse) -> CacheResult<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(CacheError::QuotaExceeded(cache.to_string()));
        }

        let mut caches = self.caches.write().await;
        match caches.iter_mut().find(|(name, _)| name == cache) {
            Some((_, entries)) => {
                entries.insert(key.clone(), response);
            }
            None => {
                let mut entries = HashMap::new();
                entries.insert(key.clone(), response);
                caches.push((cache.to_string(), entries));
            }
        }
        Ok(())
    }

    async fn keys(&self, cache: &str) -> CacheResult<Vec<RequestKey>> {
        let caches = self.caches.read().await;
        let mut keys: Vec<RequestKey> = caches
            .iter()
            .find(|(name, _)| name == cache)
            .map(|(_, entries)| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;

    fn key(path: &str) -> RequestKey {
        RequestKey::get(&Url::parse("https://shop.example.com").unwrap().join(path).unwrap())
    }

    fn entry(body: &str) -> CachedResponse {
        CachedResponse::from_response(&offline_fetch::Response::ok(body), 0)
    }

    #[tokio::test]
    async fn test_put_replaces_entry() {
        let storage = MemoryCacheStorage::new();
        storage.put("dynamic-v3", &key("/api/cart"), entry("one")).await.unwrap();
        storage.put("dynamic-v3", &key("/api/cart"), entry("two")).await.unwrap();

        let found = storage.get("dynamic-v3", &key("/api/cart")).await.unwrap().unwrap();
        assert_eq!(found.body, b"two");
        assert_eq!(storage.keys("dynamic-v3").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_match_any_follows_creation_order() {
        let storage = MemoryCacheStorage::new();
        storage.put("static-v3", &key("/index.html"), entry("static")).await.unwrap();
        storage.put("dynamic-v3", &key("/index.html"), entry("dynamic")).await.unwrap();

        let found = storage.match_any(&key("/index.html")).await.unwrap().unwrap();
        assert_eq!(found.body, b"static");
        assert_eq!(storage.names().await.unwrap(), vec!["static-v3", "dynamic-v3"]);
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let storage = MemoryCacheStorage::new();
        storage.open("images-v2").await.unwrap();
        assert!(storage.delete("images-v2").await.unwrap());
        assert!(!storage.delete("images-v2").await.unwrap());
        assert!(!storage.has("images-v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejected_writes() {
        let storage = MemoryCacheStorage::new();
        storage.reject_writes(true);
        let result = storage.put("dynamic-v3", &key("/api/cart"), entry("x")).await;
        assert!(matches!(result, Err(CacheError::QuotaExceeded(_))));
    }
}
