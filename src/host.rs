//! HTTP host that runs the proxy in front of an origin.
//!
//! Every incoming request, whatever its method or path, is resolved against
//! the configured origin and handed to [`CacheProxy::intercept`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::{Request as HttpRequest, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response as HttpResponse};
use url::Url;

use crate::error::{Error, Result};
use crate::network::Network;
use crate::request::Request;
use crate::response::Response;
use crate::store::CacheStorage;
use crate::worker::CacheProxy;

/// Largest request body forwarded to the origin.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

struct AppState<S: CacheStorage, N: Network> {
    proxy: Arc<CacheProxy<S, N>>,
    origin: Url,
}

impl<S: CacheStorage, N: Network> Clone for AppState<S, N> {
    fn clone(&self) -> Self {
        Self {
            proxy: Arc::clone(&self.proxy),
            origin: self.origin.clone(),
        }
    }
}

/// Builds a router that intercepts every request.
///
/// # Errors
///
/// Returns an error if the proxy's origin is not an absolute URL.
pub fn router<S, N>(proxy: Arc<CacheProxy<S, N>>) -> Result<Router>
where
    S: CacheStorage + 'static,
    N: Network + 'static,
{
    let origin = proxy.config().origin_url()?;
    Ok(Router::new()
        .fallback(dispatch::<S, N>)
        .with_state(AppState { proxy, origin }))
}

/// Serves `proxy` on `host:port` until SIGINT.
///
/// The proxy should already be installed; until it is, every request is
/// answered with `503 Service Unavailable`.
///
/// # Errors
///
/// Returns an error if the address is invalid or cannot be bound.
pub async fn run_server<S, N>(proxy: Arc<CacheProxy<S, N>>, host: &str, port: u16) -> Result<()>
where
    S: CacheStorage + 'static,
    N: Network + 'static,
{
    let app = router(proxy)?;
    let addr: SocketAddr = format!("{host}:{port}").parse().map_err(|e| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid bind address {host}:{port}: {e}"),
        ))
    })?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Serving cache proxy on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Received SIGINT");
        })
        .await?;

    log::info!("Shutdown complete");
    Ok(())
}

async fn dispatch<S, N>(State(state): State<AppState<S, N>>, req: HttpRequest) -> HttpResponse
where
    S: CacheStorage + 'static,
    N: Network + 'static,
{
    let request = match to_proxy_request(&state.origin, req).await {
        Ok(request) => request,
        Err(rejection) => return rejection.into_response(),
    };

    match state.proxy.intercept(&request).await {
        Ok(resp) => into_http_response(resp),
        Err(e) => {
            log::error!("{} {} failed: {e}", request.method, request.url);
            (error_status(&e), e.to_string()).into_response()
        }
    }
}

async fn to_proxy_request(
    origin: &Url,
    req: HttpRequest,
) -> std::result::Result<Request, (StatusCode, String)> {
    let (parts, body) = req.into_parts();
    // Only path and query come from the client; scheme and authority stay the origin's.
    let mut url = origin.clone();
    url.set_path(parts.uri.path());
    url.set_query(parts.uri.query());
    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| (StatusCode::PAYLOAD_TOO_LARGE, e.to_string()))?;

    let mut headers = parts.headers;
    // The origin's host, not ours, must reach the origin.
    headers.remove(header::HOST);

    Ok(Request::new(parts.method, url)
        .with_headers(headers)
        .with_body(body))
}

fn into_http_response(resp: Response) -> HttpResponse {
    let status = match StatusCode::from_u16(resp.status) {
        Ok(status) if !status.is_informational() => status,
        _ => StatusCode::BAD_GATEWAY,
    };
    let mut headers: HeaderMap = resp.header_map();
    // The body is fully buffered; framing is recomputed on the way out.
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::TRANSFER_ENCODING);
    headers.remove(header::CONNECTION);
    (status, headers, Body::from(resp.body)).into_response()
}

const fn error_status(error: &Error) -> StatusCode {
    match error {
        Error::NotActive => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    }
}
