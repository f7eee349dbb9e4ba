//! The cache proxy: install-time warm-up and cache-first interception.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use futures::future;

use crate::config::ProxyConfig;
use crate::error::{Error, Result};
use crate::network::{HttpNetwork, Network};
use crate::request::{CacheKey, Request};
use crate::response::Response;
use crate::store::{Cache, CacheStorage, DiskStorage};

/// Outcome of the most recent install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No install has been attempted.
    Uninstalled,
    /// An install is running.
    Installing,
    /// The last install stored the whole warm set.
    Installed,
    /// The last install failed.
    Failed,
}

impl Lifecycle {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Uninstalled => 0,
            Self::Installing => 1,
            Self::Installed => 2,
            Self::Failed => 3,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Installing,
            2 => Self::Installed,
            3 => Self::Failed,
            _ => Self::Uninstalled,
        }
    }
}

/// What a successful install stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Name of the cache that was populated.
    pub cache_name: String,
    /// Keys written, in warm set order.
    pub stored: Vec<CacheKey>,
}

/// Cache-first proxy over a named cache and the network.
///
/// [`install`](Self::install) fetches the warm set and stores it in one batch;
/// [`intercept`](Self::intercept) answers requests from the cache, falling
/// back to the network on a miss. Interception never writes to the cache.
pub struct CacheProxy<S: CacheStorage = DiskStorage, N: Network = HttpNetwork> {
    storage: S,
    network: N,
    config: ProxyConfig,
    lifecycle: AtomicU8,
    active: AtomicBool,
}

impl<S: CacheStorage, N: Network> CacheProxy<S, N> {
    /// Creates an uninstalled proxy.
    pub const fn new(storage: S, network: N, config: ProxyConfig) -> Self {
        Self {
            storage,
            network,
            config,
            lifecycle: AtomicU8::new(Lifecycle::Uninstalled.as_u8()),
            active: AtomicBool::new(false),
        }
    }

    pub const fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    pub const fn network(&self) -> &N {
        &self.network
    }

    /// State of the most recent install.
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::Acquire))
    }

    /// Whether some install has succeeded, enabling interception.
    ///
    /// A later failed install does not deactivate the proxy.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn set_lifecycle(&self, state: Lifecycle) {
        self.lifecycle.store(state.as_u8(), Ordering::Release);
    }

    /// Opens the cache and stores a fresh copy of every warm set resource.
    ///
    /// Completes once every resource is stored, or with the first failure.
    /// A failed install writes nothing to the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be opened, an identifier cannot be
    /// resolved or appears twice, any fetch fails or returns a non-success
    /// status, or the batch cannot be written.
    pub async fn install(&self) -> Result<InstallReport> {
        log::info!("Service Worker: Installed");
        self.set_lifecycle(Lifecycle::Installing);

        match self.warm_up().await {
            Ok(report) => {
                self.set_lifecycle(Lifecycle::Installed);
                self.active.store(true, Ordering::Release);
                log::info!(
                    "Cached {} resources in {}",
                    report.stored.len(),
                    report.cache_name
                );
                Ok(report)
            }
            Err(e) => {
                self.set_lifecycle(Lifecycle::Failed);
                log::error!("Install failed: {e}");
                Err(e)
            }
        }
    }

    async fn warm_up(&self) -> Result<InstallReport> {
        let cache = self.storage.open(&self.config.cache_name).await?;

        let requests: Vec<Request> = self
            .config
            .warm_urls()?
            .into_iter()
            .map(Request::get)
            .collect();
        let keys: Vec<CacheKey> = requests.iter().map(|r| CacheKey::get(&r.url)).collect();

        {
            let mut seen = HashSet::with_capacity(keys.len());
            if let Some(dup) = keys.iter().find(|k| !seen.insert(*k)) {
                return Err(Error::DuplicateRequest(dup.url().to_owned()));
            }
        }

        let responses = future::try_join_all(requests.iter().map(|r| self.fetch_ok(r))).await?;

        let batch: Vec<(CacheKey, Response)> = keys.iter().cloned().zip(responses).collect();
        cache.put_all(batch).await?;

        Ok(InstallReport {
            cache_name: self.config.cache_name.clone(),
            stored: keys,
        })
    }

    async fn fetch_ok(&self, request: &Request) -> Result<Response> {
        let resp = self.network.fetch(request).await?;
        if resp.is_ok() {
            Ok(resp)
        } else {
            Err(Error::BadStatus {
                url: request.url.to_string(),
                status: resp.status,
            })
        }
    }

    /// Answers `request` from the cache, or from the network on a miss.
    ///
    /// Hits are returned verbatim with no revalidation. Misses are forwarded
    /// unmodified and the network's answer, error statuses included, is
    /// returned without being stored. Non-`GET` requests always miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotActive`] before the first successful install, and
    /// propagates cache access failures and network failures on a miss.
    pub async fn intercept(&self, request: &Request) -> Result<Response> {
        if !self.is_active() {
            return Err(Error::NotActive);
        }

        if let Some(key) = request.cache_key() {
            let cache = self.storage.open(&self.config.cache_name).await?;
            if let Some(hit) = cache.match_key(&key).await? {
                log::debug!("Cache hit: {key}");
                return Ok(hit);
            }
            log::debug!("Cache miss: {key}");
        }

        self.network.fetch(request).await
    }
}
