//! Address search and reverse geocoding.

use axum::{Json, body::Bytes, extract::State};
use serde::{Deserialize, Serialize};

use super::parse_json;
use crate::gateway::GatewayError;
use crate::geo::{Address, parse_coordinate};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

/// Coordinates are accepted as JSON strings or numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Text(String),
    Number(serde_json::Number),
}

impl Coordinate {
    fn into_text(self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GeocodeRequest {
    pub lat: Coordinate,
    pub lng: Coordinate,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddressResponse {
    pub addresses: Vec<Address>,
}

/// `POST /api/address/search`
pub async fn search(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AddressResponse>, GatewayError> {
    let request: SearchRequest = parse_json(&body)?;
    let addresses = state.lookup.search(&request.query).await?;
    Ok(Json(AddressResponse { addresses }))
}

/// `POST /api/address/geocode`
///
/// Both coordinates must be decimal numbers; anything else is rejected before
/// the cache or the provider is consulted.
pub async fn geocode(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AddressResponse>, GatewayError> {
    let request: GeocodeRequest = parse_json(&body)?;
    let lat = request.lat.into_text();
    let lng = request.lng.into_text();
    parse_coordinate("lat", &lat)?;
    parse_coordinate("lng", &lng)?;

    let addresses = state.lookup.geocode(&lat, &lng).await?;
    Ok(Json(AddressResponse { addresses }))
}
