//! Network access for warm-up fetches and cache misses.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::request::Request;
use crate::response::Response;

/// Abstraction over the network for testability.
#[async_trait]
pub trait Network: Send + Sync {
    /// Sends `request` and returns whatever the server answers.
    ///
    /// Error statuses are returned as responses; only transport failures are
    /// errors.
    async fn fetch(&self, request: &Request) -> Result<Response>;
}

/// Default network implementation backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
}

impl HttpNetwork {
    /// Wraps an existing client.
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds a network with a pooled client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn build() -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        log::debug!("Fetching {} {}", request.method, request.url);
        let resp = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .body(request.body.clone())
            .send()
            .await?;

        let url = resp.url().to_string();
        let status = resp.status().as_u16();
        let headers = Response::headers_from_map(resp.headers());
        let body = resp.bytes().await?;

        Ok(Response {
            url,
            status,
            headers,
            body,
        })
    }
}
