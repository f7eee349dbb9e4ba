//! Error types for the cache-proxy library.

use thiserror::Error;

/// Errors that can occur during install, interception, or store access.
#[derive(Error, Debug)]
pub enum Error {
    /// Network request failed (connection, DNS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A warm-up response came back with a non-success status.
    #[error("Warm-up fetch of {url} returned status {status}")]
    BadStatus {
        /// URL that was fetched.
        url: String,
        /// Status code the network returned.
        status: u16,
    },

    /// The same request appears more than once in a single batch.
    #[error("Duplicate request in batch: {0}")]
    DuplicateRequest(String),

    /// Only `GET` requests can be stored.
    #[error("Cannot cache a {0} request")]
    UncacheableMethod(String),

    /// A resource identifier or origin could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Interception was attempted before any install succeeded.
    #[error("Cache proxy is not active")]
    NotActive,

    /// I/O error while reading or writing the cache store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache store file could not be decoded.
    #[error("Corrupt cache store: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// A specialized `Result` type for cache-proxy operations.
pub type Result<T> = std::result::Result<T, Error>;
