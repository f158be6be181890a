use std::time::Instant;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::{
    body::Body,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::gateway::GatewayError;
use crate::metrics::Metrics;
use crate::server::AppState;

// =============================================================================
// Metrics Middleware
// =============================================================================

/// Counts every request and times it end to end, proxied requests included.
///
/// Installed as the outermost layer so the recorded latency covers
/// authentication, lookups and upstream forwarding. The request is counted
/// before it is handled and timed when its guard drops, so a request
/// whose client disconnects mid-flight is still observed.
pub async fn metrics_middleware(
    State(metrics): State<Metrics>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_owned();
    metrics.count_http_request(&path);
    let _timer = RequestTimer {
        metrics,
        path,
        started: Instant::now(),
    };

    next.run(req).await
}

/// Records the request duration on drop, including when the handler future is cancelled.
struct RequestTimer {
    metrics: Metrics,
    path: String,
    started: Instant,
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        self.metrics
            .record_http_duration(&self.path, self.started.elapsed());
    }
}

// =============================================================================
// Authentication Middleware
// =============================================================================

/// Login of the caller, inserted into request extensions once the token verifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub login: String,
}

/// Rejects requests to protected routes that lack a correctly signed token.
///
/// The token is taken from `Authorization: Bearer <token>`; when no
/// `Authorization` header is sent, the session cookie is used instead.
pub async fn authentication_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match extract_token(req.headers(), &state.session_cookie.name) {
        Ok(token) => token,
        Err(message) => {
            tracing::debug!(path = %req.uri().path(), reason = message, "Request rejected");
            return GatewayError::Unauthorized(message.to_string()).into_response();
        }
    };

    match state.auth.verify_token(&token) {
        Ok(claims) => {
            tracing::debug!(login = %claims.login, "Token validated successfully");
            req.extensions_mut()
                .insert(AuthenticatedUser { login: claims.login });
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Token validation failed");
            GatewayError::Unauthorized("invalid token".to_string()).into_response()
        }
    }
}

fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Result<String, &'static str> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| "invalid Authorization header")?;
        return match value.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err("invalid Authorization header format"),
        };
    }

    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .ok_or("no token found")
}
