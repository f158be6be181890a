//! Address lookups: the provider client and the cache-aside decorator in front of it.
//!
//! Both sides implement [`AddressLookup`], so routes never know whether a
//! result came from the cache or from the provider.

pub mod cached;
pub mod dadata;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::CacheError;

pub use cached::{CacheKey, CachedLookup};
pub use dadata::DadataClient;

/// A structured address returned by the geo provider.
///
/// Results are ordered sequences; the provider's order is kept end-to-end,
/// through the cache included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unrestricted_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<String>,
}

/// Errors from an address lookup.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The provider failed, answered with an error status or sent an unreadable body.
    #[error("geo provider error: {0}")]
    Provider(String),

    /// The cache could not be read, or held a value that does not decode.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Coordinates that are not decimal numbers.
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

impl LookupError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }
}

/// The two geo lookups served by the gateway.
#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// Addresses matching free-text `query`.
    async fn search(&self, query: &str) -> Result<Vec<Address>, LookupError>;

    /// Addresses nearest to the given coordinates, passed as decimal strings.
    async fn geocode(&self, lat: &str, lng: &str) -> Result<Vec<Address>, LookupError>;
}

/// Type alias for a shared lookup implementation.
pub type DynLookup = Arc<dyn AddressLookup>;

/// Parse a decimal coordinate.
pub fn parse_coordinate(name: &str, raw: &str) -> Result<f64, LookupError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LookupError::InvalidCoordinates(format!("{name} must be a number, got {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("lat", "59.923013").unwrap(), 59.923013);
        assert_eq!(parse_coordinate("lat", " 30 ").unwrap(), 30.0);
        assert!(parse_coordinate("lat", "north").is_err());
        assert!(parse_coordinate("lat", "").is_err());
        assert!(parse_coordinate("lat", "NaN").is_err());
    }

    #[test]
    fn test_address_omits_missing_fields() {
        let address = Address {
            value: Some("Москва".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&address).unwrap();
        assert_eq!(json, serde_json::json!({ "value": "Москва" }));
    }
}
