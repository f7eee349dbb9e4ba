//! In-memory cache storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::{Cache, CacheStorage, Entry, lookup, merge, validate_batch};
use crate::error::Result;
use crate::request::CacheKey;
use crate::response::Response;

/// Cache storage that lives for as long as the value (and its clones) does.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    caches: Arc<Mutex<HashMap<String, MemoryCache>>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    type Cache = MemoryCache;

    async fn open(&self, name: &str) -> Result<MemoryCache> {
        let mut caches = self.caches.lock().await;
        Ok(caches.entry(name.to_owned()).or_default().clone())
    }
}

/// Handle to one in-memory cache. Clones share entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<Vec<Entry>>>,
}

impl MemoryCache {
    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn match_key(&self, key: &CacheKey) -> Result<Option<Response>> {
        Ok(lookup(&self.entries.read().await, key))
    }

    async fn put_all(&self, batch: Vec<(CacheKey, Response)>) -> Result<()> {
        validate_batch(&batch)?;
        merge(&mut *self.entries.write().await, batch);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<CacheKey>> {
        Ok(self.entries.read().await.iter().map(|e| e.key.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn key(path: &str) -> CacheKey {
        CacheKey::get(&Url::parse("http://localhost").unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn open_creates_then_shares() {
        let storage = MemoryStorage::new();
        let first = storage.open("video-downloader-cache").await.unwrap();
        assert!(first.is_empty().await);

        first
            .put_all(vec![(key("/"), Response::new("http://localhost/", 200))])
            .await
            .unwrap();

        let second = storage.open("video-downloader-cache").await.unwrap();
        assert_eq!(second.len().await, 1);
        assert!(second.match_key(&key("/")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn names_are_isolated() {
        let storage = MemoryStorage::new();
        let a = storage.open("a").await.unwrap();
        let b = storage.open("b").await.unwrap();
        a.put_all(vec![(key("/"), Response::new("/", 200))]).await.unwrap();
        assert!(b.match_key(&key("/")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_batch_writes_nothing() {
        let cache = MemoryStorage::new().open("c").await.unwrap();
        let result = cache
            .put_all(vec![
                (key("/"), Response::new("/", 200)),
                (key("/"), Response::new("/", 200)),
            ])
            .await;
        assert!(result.is_err());
        assert!(cache.keys().await.unwrap().is_empty());
    }
}
