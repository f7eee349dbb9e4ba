//! cache-proxy - A cache-first fetch proxy with an install-time warm cache.
//!
//! On install the proxy fetches a fixed warm set of resources and stores them
//! in a named cache. Afterwards every intercepted request is answered from
//! that cache when possible and forwarded to the network otherwise. Misses are
//! never written back.
//!
//! # Example
//!
//! ```no_run
//! use cache_proxy::{CacheProxy, HttpNetwork, MemoryStorage, ProxyConfig, Request};
//!
//! # async fn example() -> cache_proxy::Result<()> {
//! let config = ProxyConfig::default().with_origin("http://127.0.0.1:5000/");
//! let origin = config.origin_url()?;
//! let proxy = CacheProxy::new(MemoryStorage::new(), HttpNetwork::build()?, config);
//!
//! // Warm the cache with "/", "/static/logo.png" and "/manifest.json"
//! let report = proxy.install().await?;
//! println!("Cached {} resources", report.stored.len());
//!
//! // Served from the cache, no network round trip
//! let manifest = proxy.intercept(&Request::get(origin.join("/manifest.json")?)).await?;
//! assert_eq!(manifest.status, 200);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
#[cfg(feature = "server")]
pub mod host;
pub mod network;
pub mod request;
pub mod response;
pub mod store;
pub mod worker;

// Re-export main types for convenience
pub use config::{AppConfig, ProxyConfig, ServerConfig, StorageConfig};
pub use error::{Error, Result};
pub use network::{HttpNetwork, Network};
pub use request::{CacheKey, Request};
pub use response::Response;
pub use store::{Cache, CacheStorage, DiskCache, DiskStorage, MemoryCache, MemoryStorage};
pub use worker::{CacheProxy, InstallReport, Lifecycle};
