//! Configuration types for the cache proxy and its host.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

/// Name of the cache the proxy opens by default.
pub const DEFAULT_CACHE_NAME: &str = "video-downloader-cache";

/// Resources pre-cached on install by default.
pub const DEFAULT_WARM_SET: [&str; 3] = ["/", "/static/logo.png", "/manifest.json"];

/// Origin the warm set and intercepted paths are resolved against by default.
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:5000/";

/// Configuration for the cache proxy itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Name of the cache to open.
    pub cache_name: String,
    /// Origin that relative identifiers are resolved against.
    pub origin: String,
    /// Resource identifiers fetched and stored on install, in order.
    pub warm_set: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            warm_set: DEFAULT_WARM_SET.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ProxyConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache name.
    #[must_use]
    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    /// Sets the origin.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Replaces the warm set.
    #[must_use]
    pub fn with_warm_set<I, S>(mut self, warm_set: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.warm_set = warm_set.into_iter().map(Into::into).collect();
        self
    }

    /// Parses the origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin is not an absolute URL.
    pub fn origin_url(&self) -> crate::Result<Url> {
        Ok(Url::parse(&self.origin)?)
    }

    /// Resolves every warm set identifier against the origin, keeping order.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin or any identifier cannot be resolved.
    pub fn warm_urls(&self) -> crate::Result<Vec<Url>> {
        let origin = self.origin_url()?;
        self.warm_set
            .iter()
            .map(|id| origin.join(id).map_err(crate::Error::from))
            .collect()
    }
}

/// HTTP host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Where the named caches live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding cache files.
    pub cache_dir: PathBuf,
    /// Keep caches in memory only (nothing survives a restart).
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            cache_dir: cache_dir.join("cache-proxy"),
            in_memory: false,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub proxy: ProxyConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location of the config file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cache-proxy")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file, falling back to defaults if the
    /// file does not exist. Missing keys take their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> crate::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_proxy_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.cache_name, "video-downloader-cache");
        assert_eq!(config.warm_set, vec!["/", "/static/logo.png", "/manifest.json"]);
    }

    #[test]
    fn proxy_config_builder_pattern() {
        let config = ProxyConfig::new()
            .with_cache_name("other")
            .with_origin("https://example.com/app/")
            .with_warm_set(["/a"]);

        assert_eq!(config.cache_name, "other");
        assert_eq!(config.origin, "https://example.com/app/");
        assert_eq!(config.warm_set, vec!["/a"]);
    }

    #[test]
    fn warm_urls_resolve_against_origin_in_order() {
        let urls = ProxyConfig::default().warm_urls().unwrap();
        let urls: Vec<_> = urls.iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "http://127.0.0.1:5000/",
                "http://127.0.0.1:5000/static/logo.png",
                "http://127.0.0.1:5000/manifest.json",
            ]
        );
    }

    #[test]
    fn relative_origin_is_rejected() {
        let config = ProxyConfig::new().with_origin("/not-absolute");
        assert!(matches!(config.warm_urls(), Err(crate::Error::InvalidUrl(_))));
    }

    #[test]
    fn default_storage_config() {
        let config = StorageConfig::default();
        assert!(config.cache_dir.to_string_lossy().contains("cache-proxy"));
        assert!(!config.in_memory);
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.proxy.cache_name, DEFAULT_CACHE_NAME);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[proxy]\norigin = \"https://videos.example/\"\n\n[server]\nport = 9000\n",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.proxy.origin, "https://videos.example/");
        assert_eq!(config.proxy.cache_name, DEFAULT_CACHE_NAME);
        assert_eq!(config.proxy.warm_set.len(), 3);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn load_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[proxy\n").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(crate::Error::Config(_))));
    }

    #[test]
    fn app_config_serializes_to_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let back: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.proxy.warm_set, config.proxy.warm_set);
        assert_eq!(back.storage.cache_dir, config.storage.cache_dir);
    }
}
