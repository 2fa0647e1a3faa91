//! Results, export and filter-removal endpoints
//!
//! Request parameters are folded into the caller's stored [`SearchState`]
//! first; the search itself always runs from state, which is what lets the
//! remove-filter links work without carrying the whole query around.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde::Serialize;
use tracing::info;

use crate::api::error::ApiError;
use crate::db;
use crate::error::SearchError;
use crate::export::{export_filename, export_stream, ExportLayout};
use crate::filters::{parse_positive, Facet, FilterSet, RawFilters};
use crate::model::{ResultEntry, SchoolDetails, SearchMode};
use crate::pagination::Pagination;
use crate::search::{rank_schools, resolve_anchor, search_page, Anchor, SqliteEntrySource};
use crate::selected::{build_selected_filters, SelectedFilters};
use crate::state_store::{SearchState, SessionId};
use crate::AppState;

pub const RESULTS_PATH: &str = "/results";

/// Parameters of a results request, split out of the raw query pairs
#[derive(Debug, Default)]
pub struct ResultsRequest {
    pub mode: Option<String>,
    pub location: Option<String>,
    pub provider: Option<String>,
    pub school: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub filters: RawFilters,
}

impl ResultsRequest {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut request = ResultsRequest::default();
        for (key, value) in &pairs {
            let slot = match key.as_str() {
                "mode" => &mut request.mode,
                "location" => &mut request.location,
                "provider" => &mut request.provider,
                "school" => &mut request.school,
                "page" => &mut request.page,
                "limit" => &mut request.limit,
                _ => continue,
            };
            if slot.is_none() && !value.trim().is_empty() {
                *slot = Some(value.trim().to_string());
            }
        }
        request.filters = RawFilters::from_pairs(pairs);
        request
    }

    fn anchor(&self, mode: SearchMode) -> Option<&String> {
        match mode {
            SearchMode::Location => self.location.as_ref(),
            SearchMode::Provider => self.provider.as_ref(),
            SearchMode::School => self.school.as_ref(),
        }
    }

    /// Fold this request into stored state
    pub fn apply_to(&self, stored: &mut SearchState) -> Result<(), SearchError> {
        if let Some(mode) = &self.mode {
            stored.mode = Some(mode.parse()?);
        }
        for mode in [SearchMode::Location, SearchMode::Provider, SearchMode::School] {
            if let Some(id) = self.anchor(mode) {
                stored.set_anchor(mode, id.clone());
            }
        }

        let incoming = FilterSet::normalize(&self.filters);
        if self.filters.has_filter_keys() {
            stored.filters = stored.filters.with_facets_from(&incoming);
        }
        if self.filters.has_keywords() {
            stored.filters = stored.filters.with_keywords(incoming.keywords);
        }
        if let Some(mode) = stored.mode {
            stored.filters = stored.filters.restricted_to(mode);
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ResultsActions {
    pub view: String,
    pub export: String,
    pub remove_all_filters: String,
    pub remove_keyword_search: String,
    pub filter_options: String,
    pub change_search: String,
}

impl ResultsActions {
    fn for_mode(mode: SearchMode) -> Self {
        Self {
            view: RESULTS_PATH.to_string(),
            export: format!("{}/export", RESULTS_PATH),
            remove_all_filters: format!("{}/remove-all-filters", RESULTS_PATH),
            remove_keyword_search: format!("{}/remove-keyword-search", RESULTS_PATH),
            filter_options: format!("/filter-options?mode={}", mode),
            change_search: mode.entry_path(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub anchor: Anchor,
    pub entries: Vec<ResultEntry>,
    pub pagination: Pagination,
    pub filters: FilterSet,
    pub has_filters: bool,
    pub selected_filters: Option<SelectedFilters>,
    pub keywords: Option<String>,
    pub actions: ResultsActions,
    /// Detail view of the anchor school (school mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_detail: Option<SchoolDetails>,
}

/// Apply request parameters to the session, then resolve mode and anchor
async fn prepare(
    state: &AppState,
    session: &SessionId,
    request: &ResultsRequest,
) -> Result<(SearchState, Anchor), ApiError> {
    let previous = state.filter_store.load(session).await;
    let mut stored = previous.clone();
    request.apply_to(&mut stored)?;
    if stored != previous {
        state.filter_store.save(session, stored.clone()).await;
    }

    let mode = stored.mode.ok_or(SearchError::MissingMode)?;
    let anchor = resolve_anchor(
        &state.db,
        state.geocoder.as_ref(),
        &stored,
        mode,
        state.settings.default_radius_miles,
    )
    .await?;

    Ok((stored, anchor))
}

/// GET /results
///
/// One page of results for the caller's current search.
pub async fn get_results(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let request = ResultsRequest::from_pairs(pairs);
    let (stored, anchor) = prepare(&state, &session, &request).await?;
    let mode = anchor.mode();

    let page = parse_positive(request.page.as_deref(), 1);
    let limit = parse_positive(request.limit.as_deref(), state.settings.default_page_size);

    let ranked = rank_schools(&state.db, &anchor, &stored.filters).await?;
    let source = SqliteEntrySource::new(state.db.clone(), &anchor);
    let result = search_page(&source, &ranked, page, limit).await?;

    let selected_filters =
        build_selected_filters(&stored.filters, mode, state.labels.as_ref()).await;

    let school_detail = match &anchor {
        Anchor::School { id, .. } => db::fetch_school_details(&state.db, id).await?,
        _ => None,
    };

    Ok(Json(ResultsResponse {
        anchor,
        entries: result.entries,
        pagination: result.pagination,
        has_filters: selected_filters.is_some(),
        selected_filters,
        keywords: stored.filters.keywords.clone(),
        filters: stored.filters,
        actions: ResultsActions::for_mode(mode),
        school_detail,
    }))
}

/// GET /results/export
///
/// The caller's current search as a streamed CSV download. Accepts the same
/// mode, anchor and filter parameters as `/results`; page and limit are ignored.
pub async fn export_results(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let mut request = ResultsRequest::from_pairs(pairs);
    request.page = None;
    request.limit = None;

    let (stored, anchor) = prepare(&state, &session, &request).await?;

    let ranked = rank_schools(&state.db, &anchor, &stored.filters).await?;
    let filename = export_filename(anchor.display_name(), chrono::Local::now().naive_local());
    info!(mode = %anchor.mode(), rows = ranked.len(), filename = %filename, "Starting export");

    let source = Arc::new(SqliteEntrySource::new(state.db.clone(), &anchor));
    let stream = export_stream(
        source,
        ranked,
        ExportLayout::new(anchor.mode()),
        state.settings.export_batch_size,
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// GET /results/remove-<facet>-filter/:code
///
/// Registered once per facet; the facet is bound when the route is built.
pub async fn remove_filter(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(code): Path<String>,
    facet: Facet,
) -> Redirect {
    state.filter_store.remove(&session, facet, &code).await;
    Redirect::to(RESULTS_PATH)
}

/// GET /results/remove-all-filters
pub async fn remove_all_filters(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Redirect {
    state.filter_store.clear_all(&session).await;
    Redirect::to(RESULTS_PATH)
}

/// GET /results/remove-keyword-search
pub async fn remove_keyword_search(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Redirect {
    state.filter_store.clear_keywords(&session).await;
    Redirect::to(RESULTS_PATH)
}
