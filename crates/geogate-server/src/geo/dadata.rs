//! Client for the DaData suggestions API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{Address, AddressLookup, LookupError, parse_coordinate};
use crate::config::GeoConfig;

pub struct DadataClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    secret_key: Option<String>,
}

impl std::fmt::Debug for DadataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DadataClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl DadataClient {
    pub fn new(config: &GeoConfig) -> Result<Self, LookupError> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LookupError::provider(format!("failed to build HTTP client: {e}")))?;

        if config.api_key.is_empty() {
            warn!("geo.api_key is empty; provider requests will be rejected");
        }

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    async fn suggest(&self, path: &str, body: serde_json::Value) -> Result<Vec<Address>, LookupError> {
        let url = format!("{}/{}", self.base_url, path);

        let mut request = self
            .http_client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", self.api_key))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body);
        if let Some(secret) = &self.secret_key {
            request = request.header("X-Secret", secret);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::provider(format!("request to {path} timed out"))
            } else {
                LookupError::provider(format!("request to {path} failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LookupError::provider(format!(
                "{path} answered {status}: {}",
                detail.chars().take(200).collect::<String>()
            )));
        }

        let payload: SuggestResponse = response
            .json()
            .await
            .map_err(|e| LookupError::provider(format!("unreadable {path} response: {e}")))?;

        debug!(path, count = payload.suggestions.len(), "provider answered");
        Ok(payload.suggestions.into_iter().map(Address::from).collect())
    }
}

#[async_trait]
impl AddressLookup for DadataClient {
    async fn search(&self, query: &str) -> Result<Vec<Address>, LookupError> {
        self.suggest("suggest/address", json!({ "query": query }))
            .await
    }

    async fn geocode(&self, lat: &str, lng: &str) -> Result<Vec<Address>, LookupError> {
        let lat = parse_coordinate("lat", lat)?;
        let lon = parse_coordinate("lng", lng)?;
        self.suggest("geolocate/address", json!({ "lat": lat, "lon": lon }))
            .await
    }
}

#[derive(Debug, Deserialize)]
struct SuggestResponse {
    #[serde(default)]
    suggestions: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
struct Suggestion {
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    unrestricted_value: Option<String>,
    #[serde(default)]
    data: Option<SuggestionData>,
}

#[derive(Debug, Default, Deserialize)]
struct SuggestionData {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    house: Option<String>,
    #[serde(default)]
    geo_lat: Option<String>,
    #[serde(default)]
    geo_lon: Option<String>,
}

impl From<Suggestion> for Address {
    fn from(s: Suggestion) -> Self {
        let data = s.data.unwrap_or_default();
        Self {
            value: s.value,
            unrestricted_value: s.unrestricted_value,
            city: data.city,
            street: data.street,
            house: data.house,
            lat: data.geo_lat,
            lon: data.geo_lon,
        }
    }
}
