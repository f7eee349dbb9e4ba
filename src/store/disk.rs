//! File-backed cache storage.
//!
//! Each named cache is one JSON file under the storage root, named after the
//! SHA-256 of the cache name so any name is a safe file name. Writes replace
//! the whole file atomically (write `.tmp`, then rename).

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};

use super::{Cache, CacheStorage, Entry, lookup, merge, validate_batch};
use crate::error::Result;
use crate::request::CacheKey;
use crate::response::Response;

#[derive(Serialize)]
struct CacheFileRef<'a> {
    name: &'a str,
    entries: &'a [Entry],
}

#[derive(Deserialize)]
struct CacheFile {
    entries: Vec<Entry>,
}

/// Cache storage persisted under a directory.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
    open: Arc<Mutex<HashMap<String, DiskCache>>>,
}

impl DiskStorage {
    /// Creates a storage rooted at `root`. The directory is created on first open.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            open: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Directory holding the cache files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing the cache called `name`.
    #[must_use]
    pub fn cache_path(&self, name: &str) -> PathBuf {
        let digest = Sha256::digest(name.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        self.root.join(format!("{hex}.json"))
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    type Cache = DiskCache;

    async fn open(&self, name: &str) -> Result<DiskCache> {
        let mut open = self.open.lock().await;
        if let Some(cache) = open.get(name) {
            return Ok(cache.clone());
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.cache_path(name);
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<CacheFile>(&bytes)?.entries,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        log::debug!(
            "Opened cache {name} at {} ({} entries)",
            path.display(),
            entries.len()
        );

        let cache = DiskCache {
            inner: Arc::new(DiskCacheInner {
                name: name.to_owned(),
                path,
                entries: RwLock::new(entries),
            }),
        };
        open.insert(name.to_owned(), cache.clone());
        Ok(cache)
    }
}

/// Handle to one file-backed cache. Clones share entries.
#[derive(Debug, Clone)]
pub struct DiskCache {
    inner: Arc<DiskCacheInner>,
}

#[derive(Debug)]
struct DiskCacheInner {
    name: String,
    path: PathBuf,
    entries: RwLock<Vec<Entry>>,
}

impl DiskCache {
    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    async fn persist(&self, entries: &[Entry]) -> Result<()> {
        let file = CacheFileRef {
            name: &self.inner.name,
            entries,
        };
        let json = serde_json::to_vec(&file)?;
        let tmp_path = self.inner.path.with_extension("json.tmp");
        let written = match tokio::fs::write(&tmp_path, json).await {
            Ok(()) => tokio::fs::rename(&tmp_path, &self.inner.path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for DiskCache {
    async fn match_key(&self, key: &CacheKey) -> Result<Option<Response>> {
        Ok(lookup(&self.inner.entries.read().await, key))
    }

    async fn put_all(&self, batch: Vec<(CacheKey, Response)>) -> Result<()> {
        validate_batch(&batch)?;
        let mut entries = self.inner.entries.write().await;
        let mut next = entries.clone();
        merge(&mut next, batch);
        // Memory only changes once the file is on disk.
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<CacheKey>> {
        Ok(self
            .inner
            .entries
            .read()
            .await
            .iter()
            .map(|e| e.key.clone())
            .collect())
    }
}
