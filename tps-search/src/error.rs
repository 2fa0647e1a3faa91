//! Search engine error type

use thiserror::Error;

use crate::geocoding::GeocodingError;
use crate::model::SearchMode;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Geocoding failed: {0}")]
    Geocoding(#[from] GeocodingError),

    #[error("Place has no coordinates: {0}")]
    PlaceWithoutCoordinates(String),

    #[error("No search mode selected")]
    MissingMode,

    #[error("Unknown search mode: {0}")]
    UnknownMode(String),

    #[error("No {0} selected")]
    MissingAnchor(SearchMode),

    #[error("{0} not found: {1}")]
    AnchorNotFound(SearchMode, String),
}

pub type Result<T> = std::result::Result<T, SearchError>;
