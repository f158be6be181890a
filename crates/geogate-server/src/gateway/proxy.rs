//! Transparent forwarding of unmatched requests to the upstream service.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, header},
    response::Response,
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tracing::{debug, info, instrument, warn};

use super::error::GatewayError;
use crate::config::UpstreamConfig;
use crate::server::AppState;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Forwards requests to a single upstream and relays the answer unchanged.
///
/// Each request is attempted once. Redirects are relayed to the client rather
/// than followed.
#[derive(Debug, Clone)]
pub struct ReverseProxy {
    http_client: reqwest::Client,
    upstream: String,
    timeout: Duration,
    body_limit: usize,
}

impl ReverseProxy {
    pub fn new(config: &UpstreamConfig, body_limit: usize) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::InternalError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            upstream: config.url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            body_limit,
        })
    }

    /// Upstream base URL requests are forwarded to.
    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    /// Forward `request` upstream and build the response to relay.
    ///
    /// # Errors
    ///
    /// `GatewayError::ProxyError` when the upstream refuses the connection,
    /// resets it or does not answer within the timeout.
    #[instrument(skip_all, fields(method = %request.method(), path = %request.uri().path()))]
    pub async fn forward(&self, request: Request) -> Result<Response, GatewayError> {
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let target_url = format!("{}{}", self.upstream, path_and_query);

        let method = request.method().clone();
        let client_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let headers = forwarded_headers(request.headers(), client_addr);

        let body_bytes = Limited::new(request.into_body(), self.body_limit)
            .collect()
            .await
            .map_err(|e| {
                if exceeds_limit(e.as_ref()) {
                    GatewayError::PayloadTooLarge(self.body_limit)
                } else {
                    GatewayError::BadRequest(format!("failed to read request body: {e}"))
                }
            })?
            .to_bytes();

        debug!(target_url = %target_url, "Proxying request");

        let upstream_response = self
            .http_client
            .request(method, &target_url)
            .headers(headers)
            .body(body_bytes)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(target_url = %target_url, error = %e, "Upstream request failed");
                if e.is_timeout() {
                    GatewayError::ProxyError(format!("upstream timed out after {:?}", self.timeout))
                } else if e.is_connect() {
                    GatewayError::ProxyError(format!("failed to connect to upstream: {e}"))
                } else {
                    GatewayError::ProxyError(format!("upstream request failed: {e}"))
                }
            })?;

        let status = upstream_response.status();
        info!(status = %status, "Proxy request completed");

        let mut response_builder = Response::builder().status(status);
        for (name, value) in upstream_response.headers() {
            if !is_hop_by_hop_header(name) {
                response_builder = response_builder.header(name, value);
            }
        }

        let response_body = upstream_response
            .bytes()
            .await
            .map_err(|e| GatewayError::ProxyError(format!("failed to read upstream body: {e}")))?;

        response_builder
            .body(Body::from(response_body))
            .map_err(|e| GatewayError::InternalError(format!("failed to build response: {e}")))
    }
}

/// Fallback handler: everything without a local route goes upstream.
pub async fn proxy_fallback(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, GatewayError> {
    state.proxy.forward(request).await
}

/// Copy end-to-end headers and add the `X-Forwarded-*` set.
fn forwarded_headers(incoming: &HeaderMap, client_addr: Option<SocketAddr>) -> HeaderMap {
    let listed = connection_listed(incoming);
    let mut headers = HeaderMap::with_capacity(incoming.len() + 3);

    for (name, value) in incoming {
        if is_hop_by_hop_header(name) || listed.iter().any(|l| l == name.as_str()) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if let Some(addr) = client_addr {
        let ip = addr.ip().to_string();
        let mut hops: Vec<&str> = incoming
            .get_all(&X_FORWARDED_FOR)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        hops.push(&ip);
        let chain = hops.join(", ");
        if let Ok(value) = HeaderValue::from_str(&chain) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }

    if !headers.contains_key(&X_FORWARDED_HOST) {
        if let Some(host) = incoming.get(header::HOST) {
            headers.insert(X_FORWARDED_HOST, host.clone());
        }
    }
    if !headers.contains_key(&X_FORWARDED_PROTO) {
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
    }

    headers
}

/// Whether reading a body failed on the length limit rather than on I/O.
fn exceeds_limit(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

/// Header names declared hop-by-hop through the `Connection` header.
fn connection_listed(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Checks if a header is a hop-by-hop header that should not be forwarded.
///
/// `Host` is included: the client sets it for the upstream's own address.
fn is_hop_by_hop_header(name: &HeaderName) -> bool {
    let name = name.as_str();
    matches!(
        name,
        "connection"
            | "keep-alive"
            | "te"
            | "trailer"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
            | "host"
    ) || name.starts_with("proxy-")
}
