//! Gateway error types and their HTTP mapping.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use geogate_auth::AuthError;
use serde_json::json;

use crate::geo::LookupError;

/// Errors surfaced by gateway handlers.
///
/// Every variant renders as `{"message": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Malformed request body or parameters (400).
    #[error("{0}")]
    BadRequest(String),

    /// Request body larger than the configured limit (413).
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Missing or invalid bearer token (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Registration or login failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A geo lookup failed.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// The upstream could not be reached or did not answer in time (502).
    #[error("upstream unavailable: {0}")]
    ProxyError(String),

    /// Generic internal error.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Auth(e) if e.is_credential_failure() => StatusCode::UNAUTHORIZED,
            Self::Auth(AuthError::InvalidToken { .. }) => StatusCode::UNAUTHORIZED,
            Self::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Lookup(LookupError::InvalidCoordinates(_)) => StatusCode::BAD_REQUEST,
            Self::Lookup(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ProxyError(_) => StatusCode::BAD_GATEWAY,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "request failed");
        }

        let mut response = (status, Json(json!({ "message": self.to_string() }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(GatewayError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(GatewayError::from(AuthError::WrongPassword).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GatewayError::from(AuthError::UnknownLogin).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            GatewayError::from(AuthError::invalid_token("bad")).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::from(AuthError::internal("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::from(LookupError::InvalidCoordinates("lat".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::from(LookupError::from(CacheError::Connection("refused".into()))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::from(LookupError::provider("down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(GatewayError::ProxyError("refused".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(GatewayError::PayloadTooLarge(16).status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_body_is_message_object() {
        let response = GatewayError::from(AuthError::WrongPassword).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
        assert_eq!(body_json(response).await, json!({ "message": "wrong password" }));
    }

    #[tokio::test]
    async fn test_proxy_error_body() {
        let response = GatewayError::ProxyError("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "upstream unavailable: connection refused" })
        );
    }
}
