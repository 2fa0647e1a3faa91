//! Database access for the search service
//!
//! The service never writes: its pool is opened with SQLite `mode=ro`.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::Path;

pub mod lookups;
pub mod placements;
pub mod schools;

pub use lookups::{fetch_options, SqlLabelResolver};
pub use placements::{
    fetch_location_candidates, fetch_placement_rows, fetch_provider_candidates,
    fetch_school_candidate, find_provider, provider_suggestions, school_partnership_rows,
    school_suggestions, ProviderSuggestion, SchoolSuggestion,
};
pub use schools::fetch_school_details;

/// Connect to the placements database in read-only mode
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        anyhow::bail!(
            "Database not found: {}\nLoad placement data before starting the search service.",
            db_path.display()
        );
    }

    let db_url = format!("sqlite://{}?mode=ro", db_path.display());

    let pool = SqlitePool::connect(&db_url)
        .await
        .context("Failed to connect to database in read-only mode")?;

    Ok(pool)
}
