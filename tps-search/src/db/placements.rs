//! Placement queries
//!
//! Candidate queries return only what ranking and facet filtering need.
//! Display detail is loaded separately for the ids that survive, a page or an
//! export batch at a time.

use serde::Serialize;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};

use crate::geo::{BoundingBox, GeoPoint};
use crate::labels::fallback_label;
use crate::model::{
    AcademicYearRef, Address, PlacementRow, ProviderRef, ProviderSummary, SchoolCandidate,
    SchoolSummary,
};

/// A school's primary address is its oldest live address row.
///
/// Ranking, display and export all join through this so a school with
/// several address rows is placed and shown from the same one.
pub(crate) const PRIMARY_ADDRESS_JOIN: &str = r#"
    LEFT JOIN school_addresses a ON a.id = (
        SELECT a2.id FROM school_addresses a2
        WHERE a2.school_id = s.id AND a2.deleted_at IS NULL
        ORDER BY a2.created_at ASC, a2.id ASC
        LIMIT 1
    )
"#;

/// Oldest live detail row, chosen the same way as the address
pub(crate) const PRIMARY_DETAIL_JOIN: &str = r#"
    LEFT JOIN school_details d ON d.id = (
        SELECT d2.id FROM school_details d2
        WHERE d2.school_id = s.id AND d2.deleted_at IS NULL
        ORDER BY d2.created_at ASC, d2.id ASC
        LIMIT 1
    )
"#;

fn candidate_sql() -> String {
    format!(
        "SELECT s.id, s.name, s.urn, s.ukprn,
                s.type_code, s.group_code, s.status_code, s.education_phase_code,
                d.region_code, a.latitude, a.longitude
         FROM schools s
         {PRIMARY_ADDRESS_JOIN}
         {PRIMARY_DETAIL_JOIN}
         WHERE s.deleted_at IS NULL"
    )
}

fn candidate_from_row(row: &SqliteRow) -> SchoolCandidate {
    SchoolCandidate {
        id: row.get("id"),
        name: row.get("name"),
        urn: row.get("urn"),
        ukprn: row.try_get("ukprn").ok().flatten(),
        type_code: row.get("type_code"),
        group_code: row.get("group_code"),
        status_code: row.get("status_code"),
        education_phase_code: row.get("education_phase_code"),
        region_code: row.try_get("region_code").ok().flatten(),
        position: GeoPoint::from_parts(
            row.try_get("latitude").ok().flatten(),
            row.try_get("longitude").ok().flatten(),
        ),
    }
}

fn candidates_from(rows: Vec<SqliteRow>) -> Vec<SchoolCandidate> {
    rows.iter().map(candidate_from_row).collect()
}

/// Schools with a live placement whose position falls inside the box
pub async fn fetch_location_candidates(
    pool: &SqlitePool,
    bbox: &BoundingBox,
) -> Result<Vec<SchoolCandidate>, sqlx::Error> {
    let sql = format!(
        "{}
          AND a.latitude IS NOT NULL AND a.longitude IS NOT NULL
          AND a.latitude BETWEEN ? AND ?
          AND a.longitude BETWEEN ? AND ?
          AND EXISTS (
              SELECT 1 FROM placement_schools p
              WHERE p.school_id = s.id AND p.deleted_at IS NULL
          )",
        candidate_sql()
    );

    let rows = sqlx::query(&sql)
        .bind(bbox.min_latitude)
        .bind(bbox.max_latitude)
        .bind(bbox.min_longitude)
        .bind(bbox.max_longitude)
        .fetch_all(pool)
        .await?;

    Ok(candidates_from(rows))
}

/// Schools partnered with a provider through any live placement
pub async fn fetch_provider_candidates(
    pool: &SqlitePool,
    provider_id: &str,
) -> Result<Vec<SchoolCandidate>, sqlx::Error> {
    let sql = format!(
        "{}
          AND EXISTS (
              SELECT 1 FROM placement_schools p
              WHERE p.school_id = s.id AND p.provider_id = ? AND p.deleted_at IS NULL
          )",
        candidate_sql()
    );

    let rows = sqlx::query(&sql).bind(provider_id).fetch_all(pool).await?;

    Ok(candidates_from(rows))
}

/// A single live school, placements or not
pub async fn fetch_school_candidate(
    pool: &SqlitePool,
    school_id: &str,
) -> Result<Option<SchoolCandidate>, sqlx::Error> {
    let sql = format!("{} AND s.id = ?", candidate_sql());
    let row = sqlx::query(&sql).bind(school_id).fetch_optional(pool).await?;

    Ok(row.as_ref().map(candidate_from_row))
}

pub async fn find_provider(
    pool: &SqlitePool,
    provider_id: &str,
) -> Result<Option<ProviderSummary>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, operating_name, legal_name, ukprn, urn
         FROM providers
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(provider_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| ProviderSummary {
        id: row.get("id"),
        operating_name: row.get("operating_name"),
        legal_name: row.try_get("legal_name").ok().flatten(),
        ukprn: row.try_get("ukprn").ok().flatten(),
        urn: row.try_get("urn").ok().flatten(),
    }))
}

pub(super) fn label_or_fallback(row: &SqliteRow, name_column: &str, code: Option<String>) -> Option<String> {
    let name: Option<String> = row.try_get(name_column).ok().flatten();
    name.or_else(|| code.as_deref().map(fallback_label))
}

fn placement_row_from(row: &SqliteRow) -> PlacementRow {
    let region_code: Option<String> = row.try_get("region_code").ok().flatten();

    let address = row
        .try_get::<Option<String>, _>("line_1")
        .ok()
        .flatten()
        .map(|line_1| Address {
            line_1,
            line_2: row.try_get("line_2").ok().flatten(),
            line_3: row.try_get("line_3").ok().flatten(),
            town: row.try_get("town").ok().flatten().unwrap_or_default(),
            county: row.try_get("county").ok().flatten(),
            postcode: row.try_get("postcode").ok().flatten().unwrap_or_default(),
        });

    let school = SchoolSummary {
        id: row.get("id"),
        name: row.get("name"),
        urn: row.get("urn"),
        ukprn: row.try_get("ukprn").ok().flatten(),
        school_type: label_or_fallback(row, "type_name", Some(row.get("type_code"))),
        group: label_or_fallback(row, "group_name", Some(row.get("group_code"))),
        status: label_or_fallback(row, "status_name", Some(row.get("status_code"))),
        education_phase: label_or_fallback(
            row,
            "phase_name",
            Some(row.get("education_phase_code")),
        ),
        region: label_or_fallback(row, "region_name", region_code),
        address,
        statutory_low_age: row.try_get("statutory_low_age").ok().flatten(),
        statutory_high_age: row.try_get("statutory_high_age").ok().flatten(),
    };

    let academic_year = match (
        row.try_get::<Option<String>, _>("year_code").ok().flatten(),
        row.try_get::<Option<String>, _>("year_name").ok().flatten(),
    ) {
        (Some(code), Some(name)) => Some(AcademicYearRef { code, name }),
        _ => None,
    };

    let provider = match (
        row.try_get::<Option<String>, _>("provider_id").ok().flatten(),
        row.try_get::<Option<String>, _>("provider_name").ok().flatten(),
    ) {
        (Some(id), Some(name)) => Some(ProviderRef { id, name }),
        _ => None,
    };

    PlacementRow {
        school,
        academic_year,
        provider,
    }
}

/// Partnership rows for a batch of schools, one row per live placement.
///
/// Schools without a matching placement still yield one row with no year or
/// provider. With `provider_id` set, only that provider's placements join.
/// Rows are ordered by school, then academic year, then provider name.
pub async fn fetch_placement_rows(
    pool: &SqlitePool,
    school_ids: &[String],
    provider_id: Option<&str>,
) -> Result<Vec<PlacementRow>, sqlx::Error> {
    if school_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        r#"
        SELECT s.id, s.name, s.urn, s.ukprn,
               s.type_code, s.group_code, s.status_code, s.education_phase_code,
               st.name AS type_name, sg.name AS group_name,
               ss.name AS status_name, sp.name AS phase_name,
               d.region_code, r.name AS region_name,
               a.line_1, a.line_2, a.line_3, a.town, a.county, a.postcode,
               d.statutory_low_age, d.statutory_high_age,
               ay.code AS year_code, ay.name AS year_name,
               pr.id AS provider_id, pr.operating_name AS provider_name
        FROM schools s
        {PRIMARY_ADDRESS_JOIN}
        {PRIMARY_DETAIL_JOIN}
        LEFT JOIN school_types st ON st.code = s.type_code
        LEFT JOIN school_groups sg ON sg.code = s.group_code
        LEFT JOIN school_statuses ss ON ss.code = s.status_code
        LEFT JOIN school_education_phases sp ON sp.code = s.education_phase_code
        LEFT JOIN regions r ON r.code = d.region_code
        LEFT JOIN placement_schools p ON p.school_id = s.id AND p.deleted_at IS NULL
        "#
    ));

    if let Some(provider_id) = provider_id {
        builder.push(" AND p.provider_id = ").push_bind(provider_id.to_string());
    }

    builder.push(
        r#"
        LEFT JOIN academic_years ay ON ay.id = p.academic_year_id AND ay.deleted_at IS NULL
        LEFT JOIN providers pr ON pr.id = p.provider_id AND pr.deleted_at IS NULL
        WHERE s.deleted_at IS NULL AND s.id IN ("#,
    );

    let mut ids = builder.separated(", ");
    for id in school_ids {
        ids.push_bind(id.clone());
    }
    ids.push_unseparated(")");

    builder.push(" ORDER BY s.id, ay.code ASC, pr.operating_name COLLATE NOCASE ASC");

    let rows = builder.build().fetch_all(pool).await?;

    Ok(rows.iter().map(placement_row_from).collect())
}

/// Every live partnership row of one school
pub async fn school_partnership_rows(
    pool: &SqlitePool,
    school_id: &str,
) -> Result<Vec<PlacementRow>, sqlx::Error> {
    fetch_placement_rows(pool, &[school_id.to_string()], None).await
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSuggestion {
    pub id: String,
    pub operating_name: String,
    pub legal_name: Option<String>,
    pub ukprn: Option<String>,
    pub urn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolSuggestion {
    pub id: String,
    pub name: String,
    pub ukprn: Option<String>,
    pub urn: String,
}

fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Live providers whose names or identifiers contain `search`
pub async fn provider_suggestions(
    pool: &SqlitePool,
    search: &str,
) -> Result<Vec<ProviderSuggestion>, sqlx::Error> {
    let pattern = like_pattern(search);
    let rows = sqlx::query(
        r#"
        SELECT id, operating_name, legal_name, ukprn, urn
        FROM providers
        WHERE deleted_at IS NULL
          AND (operating_name LIKE ?1 ESCAPE '\'
               OR legal_name LIKE ?1 ESCAPE '\'
               OR ukprn LIKE ?1 ESCAPE '\'
               OR urn LIKE ?1 ESCAPE '\')
        ORDER BY operating_name ASC
        "#,
    )
    .bind(&pattern)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ProviderSuggestion {
            id: row.get("id"),
            operating_name: row.get("operating_name"),
            legal_name: row.try_get("legal_name").ok().flatten(),
            ukprn: row.try_get("ukprn").ok().flatten(),
            urn: row.try_get("urn").ok().flatten(),
        })
        .collect())
}

/// Live schools whose name or identifiers contain `search`
pub async fn school_suggestions(
    pool: &SqlitePool,
    search: &str,
) -> Result<Vec<SchoolSuggestion>, sqlx::Error> {
    let pattern = like_pattern(search);
    let rows = sqlx::query(
        r#"
        SELECT id, name, ukprn, urn
        FROM schools
        WHERE deleted_at IS NULL
          AND (name LIKE ?1 ESCAPE '\'
               OR ukprn LIKE ?1 ESCAPE '\'
               OR urn LIKE ?1 ESCAPE '\')
        ORDER BY name ASC
        "#,
    )
    .bind(&pattern)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| SchoolSuggestion {
            id: row.get("id"),
            name: row.get("name"),
            ukprn: row.try_get("ukprn").ok().flatten(),
            urn: row.get("urn"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tps_common::db::{init_database, School, SchoolAddress};

    async fn school_with_two_addresses(dir: &TempDir) -> SqlitePool {
        let pool = init_database(&dir.path().join("placements.db")).await.unwrap();

        School {
            id: "s-001".to_string(),
            urn: "100001".to_string(),
            ukprn: None,
            name: "Elm Grove Primary".to_string(),
            type_code: "1".to_string(),
            group_code: "4".to_string(),
            status_code: "1".to_string(),
            education_phase_code: "2".to_string(),
        }
        .insert(&pool)
        .await
        .unwrap();

        // Inserted first and sorting first by id, but registered later
        for (id, line_1, latitude, created_at) in [
            ("addr-a", "2 New Street", 52.0, "2024-06-01 00:00:00"),
            ("addr-b", "1 Old Road", 51.5, "2020-01-01 00:00:00"),
        ] {
            SchoolAddress {
                id: id.to_string(),
                school_id: "s-001".to_string(),
                line_1: line_1.to_string(),
                line_2: None,
                line_3: None,
                town: "London".to_string(),
                county: None,
                postcode: "N1 1AA".to_string(),
                latitude: Some(latitude),
                longitude: Some(-0.12),
            }
            .insert(&pool)
            .await
            .unwrap();
            sqlx::query("UPDATE school_addresses SET created_at = ? WHERE id = ?")
                .bind(created_at)
                .bind(id)
                .execute(&pool)
                .await
                .unwrap();
        }

        pool
    }

    #[tokio::test]
    async fn test_oldest_address_used_for_position_and_display() {
        let dir = TempDir::new().unwrap();
        let pool = school_with_two_addresses(&dir).await;

        let candidate = fetch_school_candidate(&pool, "s-001").await.unwrap().unwrap();
        assert_eq!(candidate.position.map(|p| p.latitude), Some(51.5));

        let rows = fetch_placement_rows(&pool, &["s-001".to_string()], None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let address = rows[0].school.address.as_ref().unwrap();
        assert_eq!(address.line_1, "1 Old Road");
    }

    #[tokio::test]
    async fn test_deleted_primary_address_falls_back_to_next() {
        let dir = TempDir::new().unwrap();
        let pool = school_with_two_addresses(&dir).await;
        sqlx::query("UPDATE school_addresses SET deleted_at = CURRENT_TIMESTAMP WHERE id = 'addr-b'")
            .execute(&pool)
            .await
            .unwrap();

        let candidate = fetch_school_candidate(&pool, "s-001").await.unwrap().unwrap();
        assert_eq!(candidate.position.map(|p| p.latitude), Some(52.0));

        let rows = school_partnership_rows(&pool, "s-001").await.unwrap();
        assert_eq!(rows[0].school.address.as_ref().unwrap().line_1, "2 New Street");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("elm"), "%elm%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
