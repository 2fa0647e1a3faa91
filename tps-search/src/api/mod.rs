//! HTTP API handlers

pub mod error;
pub mod health;
pub mod options;
pub mod results;
pub mod schools;
pub mod session;
pub mod suggestions;

pub use error::ApiError;
pub use health::health_routes;
pub use options::filter_options;
pub use results::{
    export_results, get_results, remove_all_filters, remove_filter, remove_keyword_search,
};
pub use schools::{school_details, school_partnerships};
pub use session::session_middleware;
pub use suggestions::{location_suggestions, provider_suggestions, school_suggestions};
