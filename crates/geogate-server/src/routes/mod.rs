//! HTTP handlers for the gateway's local routes.

pub mod address;
pub mod auth;
pub mod metrics;

use serde::de::DeserializeOwned;

use crate::gateway::GatewayError;

/// Decode a JSON request body.
///
/// Bodies are decoded whatever their `Content-Type`, so clients that post JSON
/// as `text/plain` keep working.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(body).map_err(|e| GatewayError::BadRequest(e.to_string()))
}
