//! Filter option lists per search mode

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::db::fetch_options;
use crate::filters::{Facet, RADIUS_KEY};
use crate::labels::{radius_options, FilterOption};
use crate::model::SearchMode;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OptionsQuery {
    #[serde(default)]
    pub mode: String,
}

/// GET /filter-options?mode=
pub async fn filter_options(
    State(state): State<AppState>,
    Query(query): Query<OptionsQuery>,
) -> Result<Json<BTreeMap<&'static str, Vec<FilterOption>>>, ApiError> {
    let mode: SearchMode = query.mode.parse()?;

    let mut options = BTreeMap::new();
    for facet in Facet::offered_in(mode).iter().copied() {
        options.insert(facet.key(), fetch_options(&state.db, facet).await?);
    }
    if mode == SearchMode::Location {
        options.insert(RADIUS_KEY, radius_options());
    }

    Ok(Json(options))
}
