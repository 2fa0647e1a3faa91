//! tps-search library - training placement school finder
//!
//! Finds placement schools by location, training provider or direct school
//! lookup, narrows them with facet filters and keywords, and serves them as
//! paginated JSON or as a streamed CSV export built from the same pipeline.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod export;
pub mod facet_filter;
pub mod filters;
pub mod geo;
pub mod geocoding;
pub mod grouping;
pub mod labels;
pub mod model;
pub mod pagination;
pub mod search;
pub mod selected;
pub mod state_store;

use filters::Facet;
use geocoding::Geocoder;
use labels::LabelResolver;
use state_store::FilterStateStore;

/// Tunables taken from the `[search]` config section
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    pub default_radius_miles: f64,
    pub default_page_size: usize,
    pub export_batch_size: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        (&tps_common::config::SearchConfig::default()).into()
    }
}

impl From<&tps_common::config::SearchConfig> for SearchSettings {
    fn from(config: &tps_common::config::SearchConfig) -> Self {
        Self {
            default_radius_miles: config.default_radius_miles,
            default_page_size: config.default_page_size,
            export_batch_size: config.export_batch_size,
        }
    }
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (read-only in the service)
    pub db: SqlitePool,
    pub geocoder: Arc<dyn Geocoder>,
    pub labels: Arc<dyn LabelResolver>,
    pub filter_store: Arc<dyn FilterStateStore>,
    pub settings: SearchSettings,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        geocoder: Arc<dyn Geocoder>,
        labels: Arc<dyn LabelResolver>,
        filter_store: Arc<dyn FilterStateStore>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            db,
            geocoder,
            labels,
            filter_store,
            settings,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::extract::{Path, State};
    use axum::middleware;
    use axum::routing::get;
    use axum::Extension;
    use state_store::SessionId;

    let mut results = Router::new()
        .route("/results", get(api::get_results))
        .route("/results/export", get(api::export_results))
        .route("/results/remove-all-filters", get(api::remove_all_filters))
        .route("/results/remove-keyword-search", get(api::remove_keyword_search));

    for facet in Facet::ALL {
        results = results.route(
            &format!("/results/remove-{}-filter/:code", facet.slug()),
            get(
                move |state: State<AppState>,
                      session: Extension<SessionId>,
                      code: Path<String>| {
                    api::remove_filter(state, session, code, facet)
                },
            ),
        );
    }

    // Only the results routes read or write session state
    let results = results.layer(middleware::from_fn(api::session_middleware));

    let lookups = Router::new()
        .route("/location-suggestions", get(api::location_suggestions))
        .route("/provider-suggestions", get(api::provider_suggestions))
        .route("/school-suggestions", get(api::school_suggestions))
        .route("/filter-options", get(api::filter_options))
        .route("/schools/:id", get(api::school_details))
        .route("/schools/:id/partnerships", get(api::school_partnerships))
        .merge(api::health_routes());

    Router::new()
        .merge(results)
        .merge(lookups)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
