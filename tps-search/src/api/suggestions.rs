//! Autocomplete endpoints for the search entry forms

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::api::error::ApiError;
use crate::db::{self, ProviderSuggestion, SchoolSuggestion};
use crate::AppState;

/// Shortest input sent to the geocoder
const MIN_LOCATION_QUERY_CHARS: usize = 2;

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Serialize)]
pub struct LocationSuggestion {
    pub text: String,
    pub value: String,
}

/// GET /location-suggestions?search=
pub async fn location_suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> Response {
    let search = query.search.trim();
    if search.chars().count() < MIN_LOCATION_QUERY_CHARS {
        return Json(Vec::<LocationSuggestion>::new()).into_response();
    }

    match state.geocoder.suggestions(search).await {
        Ok(places) => Json(
            places
                .into_iter()
                .map(|p| LocationSuggestion {
                    text: p.description,
                    value: p.id,
                })
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => {
            error!(error = %e, "Place suggestions failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Vec::<LocationSuggestion>::new()),
            )
                .into_response()
        }
    }
}

/// GET /provider-suggestions?search=
pub async fn provider_suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> Result<Json<Vec<ProviderSuggestion>>, ApiError> {
    Ok(Json(db::provider_suggestions(&state.db, query.search.trim()).await?))
}

/// GET /school-suggestions?search=
pub async fn school_suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> Result<Json<Vec<SchoolSuggestion>>, ApiError> {
    Ok(Json(db::school_suggestions(&state.db, query.search.trim()).await?))
}
