//! Named cache stores.
//!
//! A [`CacheStorage`] hands out [`Cache`] handles by name, creating the cache
//! the first time it is opened. Handles opened under the same name share the
//! same entries. The proxy only ever holds a handle; the storage owns the data.

mod disk;
mod memory;

pub use disk::{DiskCache, DiskStorage};
pub use memory::{MemoryCache, MemoryStorage};

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::request::CacheKey;
use crate::response::Response;

/// A single named cache of request/response pairs.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Looks up the response stored for `key`.
    async fn match_key(&self, key: &CacheKey) -> Result<Option<Response>>;

    /// Stores every entry of `batch`, or none of them.
    ///
    /// Existing entries with the same key are overwritten in place. The batch
    /// is rejected if it holds a non-`GET` key or the same key twice.
    async fn put_all(&self, batch: Vec<(CacheKey, Response)>) -> Result<()>;

    /// Lists stored keys in insertion order.
    async fn keys(&self) -> Result<Vec<CacheKey>>;
}

/// Opens named caches, creating them if absent.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Handle type returned by [`CacheStorage::open`].
    type Cache: Cache;

    /// Opens the cache called `name`.
    async fn open(&self, name: &str) -> Result<Self::Cache>;
}

/// A stored key/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Entry {
    pub key: CacheKey,
    pub response: Response,
}

/// Rejects batches that could not be stored as a whole.
fn validate_batch(batch: &[(CacheKey, Response)]) -> Result<()> {
    let mut seen = HashSet::with_capacity(batch.len());
    for (key, _) in batch {
        if !key.is_cacheable() {
            return Err(Error::UncacheableMethod(key.method().to_owned()));
        }
        if !seen.insert(key) {
            return Err(Error::DuplicateRequest(key.url().to_owned()));
        }
    }
    Ok(())
}

/// Applies a validated batch to `entries`, overwriting matching keys.
fn merge(entries: &mut Vec<Entry>, batch: Vec<(CacheKey, Response)>) {
    for (key, response) in batch {
        match entries.iter_mut().find(|e| e.key == key) {
            Some(existing) => existing.response = response,
            None => entries.push(Entry { key, response }),
        }
    }
}

fn lookup(entries: &[Entry], key: &CacheKey) -> Option<Response> {
    entries
        .iter()
        .find(|e| &e.key == key)
        .map(|e| e.response.clone())
}
