//! Single-school views: detail and partnerships by academic year

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::db;
use crate::grouping::{group_by_academic_year, YearPartnerships};
use crate::model::SchoolDetails;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PartnershipsResponse {
    pub school_id: String,
    pub school_name: String,
    pub academic_years: Vec<YearPartnerships>,
}

/// GET /schools/:id/partnerships
pub async fn school_partnerships(
    State(state): State<AppState>,
    Path(school_id): Path<String>,
) -> Result<Json<PartnershipsResponse>, ApiError> {
    let school = db::fetch_school_candidate(&state.db, &school_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("School not found: {}", school_id)))?;

    let rows = db::school_partnership_rows(&state.db, &school.id).await?;

    Ok(Json(PartnershipsResponse {
        school_id: school.id,
        school_name: school.name,
        academic_years: group_by_academic_year(rows),
    }))
}

/// GET /schools/:id
pub async fn school_details(
    State(state): State<AppState>,
    Path(school_id): Path<String>,
) -> Result<Json<SchoolDetails>, ApiError> {
    let details = db::fetch_school_details(&state.db, &school_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("School not found: {}", school_id)))?;

    Ok(Json(details))
}
