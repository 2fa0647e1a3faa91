//! HTTP mapping of search failures
//!
//! Missing or unusable anchors send the caller back to the matching entry
//! form with a 303. Only infrastructure faults surface as 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::error::SearchError;
use crate::model::SearchMode;

/// Search entry point used when no mode has been chosen
pub const SEARCH_START_PATH: &str = "/search";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Redirect to {0}")]
    Redirect(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Database(e) => {
                error!(error = %e, "Database error during search");
                ApiError::Internal(format!("Database error: {}", e))
            }
            SearchError::Geocoding(e) => {
                warn!(error = %e, "Geocoding failed");
                ApiError::Redirect(SearchMode::Location.entry_path())
            }
            SearchError::PlaceWithoutCoordinates(name) => {
                warn!(place = %name, "Place has no coordinates");
                ApiError::Redirect(SearchMode::Location.entry_path())
            }
            SearchError::MissingMode => ApiError::Redirect(SEARCH_START_PATH.to_string()),
            SearchError::UnknownMode(mode) => {
                ApiError::NotFound(format!("Unknown search mode: {}", mode))
            }
            SearchError::MissingAnchor(mode) => ApiError::Redirect(mode.entry_path()),
            SearchError::AnchorNotFound(mode, id) => {
                warn!(mode = %mode, id = %id, "Search anchor not found");
                ApiError::Redirect(mode.entry_path())
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        SearchError::Database(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Redirect(location) => return Redirect::to(&location).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
