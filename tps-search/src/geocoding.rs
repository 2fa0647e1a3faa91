//! Place lookup collaborator
//!
//! Location mode is anchored on a place id chosen from suggestions; the
//! service only needs the place's name and coordinates. The default backend
//! is the Google Places web service.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::GeoPoint;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Restrict place suggestions to the UK
const COUNTRY_COMPONENT: &str = "country:uk";

#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Place not found: {0}")]
    PlaceNotFound(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Geocoding is not configured")]
    NotConfigured,
}

/// Resolved place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub location: Option<GeoPoint>,
}

/// Autocomplete candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSuggestion {
    pub id: String,
    pub description: String,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Name and coordinates for a place id
    async fn place_details(&self, place_id: &str) -> Result<Place, GeocodingError>;

    /// Ranked suggestions for free text
    async fn suggestions(&self, input: &str) -> Result<Vec<PlaceSuggestion>, GeocodingError>;
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<DetailsResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    name: Option<String>,
    formatted_address: Option<String>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    status: String,
    #[serde(default)]
    predictions: Vec<Prediction>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    place_id: String,
    description: String,
}

/// Google Places client
pub struct GooglePlacesClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GooglePlacesClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, GeocodingError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GeocodingError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    fn api_key(&self) -> Result<&str, GeocodingError> {
        self.api_key.as_deref().ok_or(GeocodingError::NotConfigured)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, GeocodingError> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(url = %url, "Querying Places API");

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| GeocodingError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeocodingError::ApiError(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| GeocodingError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl Geocoder for GooglePlacesClient {
    async fn place_details(&self, place_id: &str) -> Result<Place, GeocodingError> {
        let key = self.api_key()?;
        let body: DetailsResponse = self
            .get_json(
                "place/details/json",
                &[
                    ("place_id", place_id),
                    ("fields", "name,formatted_address,geometry"),
                    ("key", key),
                ],
            )
            .await?;

        match body.status.as_str() {
            "OK" => {}
            "NOT_FOUND" | "ZERO_RESULTS" | "INVALID_REQUEST" => {
                return Err(GeocodingError::PlaceNotFound(place_id.to_string()))
            }
            other => {
                return Err(GeocodingError::ApiError(
                    200,
                    body.error_message.unwrap_or_else(|| other.to_string()),
                ))
            }
        }

        let result = body
            .result
            .ok_or_else(|| GeocodingError::PlaceNotFound(place_id.to_string()))?;

        Ok(Place {
            id: place_id.to_string(),
            name: result
                .name
                .or(result.formatted_address)
                .unwrap_or_else(|| place_id.to_string()),
            location: result
                .geometry
                .map(|g| GeoPoint::new(g.location.lat, g.location.lng)),
        })
    }

    async fn suggestions(&self, input: &str) -> Result<Vec<PlaceSuggestion>, GeocodingError> {
        let key = self.api_key()?;
        let body: AutocompleteResponse = self
            .get_json(
                "place/autocomplete/json",
                &[("input", input), ("components", COUNTRY_COMPONENT), ("key", key)],
            )
            .await?;

        match body.status.as_str() {
            "OK" | "ZERO_RESULTS" => Ok(body
                .predictions
                .into_iter()
                .map(|p| PlaceSuggestion {
                    id: p.place_id,
                    description: p.description,
                })
                .collect()),
            other => Err(GeocodingError::ApiError(
                200,
                body.error_message.unwrap_or_else(|| other.to_string()),
            )),
        }
    }
}
