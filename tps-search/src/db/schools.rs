//! School detail view
//!
//! Everything shown about one school: the summary used in result lists, its
//! characteristics from the primary detail row, and its partnerships.

use sqlx::{Row, SqlitePool};

use super::placements::{label_or_fallback, school_partnership_rows, PRIMARY_DETAIL_JOIN};
use crate::grouping::group_by_academic_year;
use crate::model::{SchoolCharacteristics, SchoolDetails};

async fn fetch_characteristics(
    pool: &SqlitePool,
    school_id: &str,
) -> Result<SchoolCharacteristics, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT d.admissions_policy_code, ap.name AS admissions_policy_name,
               d.boarder_code, sb.name AS boarder_name,
               d.gender_code, sg.name AS gender_name,
               d.nursery_provision_code, np.name AS nursery_provision_name,
               d.religious_character_code, rc.name AS religious_character_name,
               d.school_capacity
        FROM schools s
        {PRIMARY_DETAIL_JOIN}
        LEFT JOIN school_admissions_policies ap ON ap.code = d.admissions_policy_code
        LEFT JOIN school_boarders sb ON sb.code = d.boarder_code
        LEFT JOIN school_genders sg ON sg.code = d.gender_code
        LEFT JOIN school_nursery_provisions np ON np.code = d.nursery_provision_code
        LEFT JOIN school_religious_characters rc ON rc.code = d.religious_character_code
        WHERE s.id = ? AND s.deleted_at IS NULL
        "#
    );

    let Some(row) = sqlx::query(&sql).bind(school_id).fetch_optional(pool).await? else {
        return Ok(SchoolCharacteristics::default());
    };

    let label = |name: &str, code: &str| {
        label_or_fallback(&row, name, row.try_get::<Option<String>, _>(code).ok().flatten())
    };

    Ok(SchoolCharacteristics {
        admissions_policy: label("admissions_policy_name", "admissions_policy_code"),
        boarder: label("boarder_name", "boarder_code"),
        gender: label("gender_name", "gender_code"),
        nursery_provision: label("nursery_provision_name", "nursery_provision_code"),
        religious_character: label("religious_character_name", "religious_character_code"),
        capacity: row.try_get("school_capacity").ok().flatten(),
    })
}

/// Full detail for one live school, or `None` when it does not exist
pub async fn fetch_school_details(
    pool: &SqlitePool,
    school_id: &str,
) -> Result<Option<SchoolDetails>, sqlx::Error> {
    let rows = school_partnership_rows(pool, school_id).await?;
    let Some(school) = rows.first().map(|row| row.school.clone()) else {
        return Ok(None);
    };

    let characteristics = fetch_characteristics(pool, school_id).await?;

    Ok(Some(SchoolDetails {
        school,
        characteristics,
        academic_years: group_by_academic_year(rows),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tps_common::db::{
        init_database, AcademicYear, LookupEntry, Placement, Provider, School, SchoolDetail,
    };

    async fn seeded(dir: &TempDir) -> SqlitePool {
        let pool = init_database(&dir.path().join("placements.db")).await.unwrap();

        for (table, code, name) in [
            ("school_types", "1", "Academy"),
            ("school_admissions_policies", "1", "Non-selective"),
            ("school_genders", "3", "Mixed"),
            ("school_religious_characters", "02", "Church of England"),
        ] {
            LookupEntry::new(code, name, 1).insert(&pool, table).await.unwrap();
        }

        School {
            id: "s-001".to_string(),
            urn: "100001".to_string(),
            ukprn: Some("10000001".to_string()),
            name: "Elm Grove Primary".to_string(),
            type_code: "1".to_string(),
            group_code: "4".to_string(),
            status_code: "1".to_string(),
            education_phase_code: "2".to_string(),
        }
        .insert(&pool)
        .await
        .unwrap();

        SchoolDetail {
            id: "d-001".to_string(),
            school_id: "s-001".to_string(),
            admissions_policy_code: Some("1".to_string()),
            gender_code: Some("3".to_string()),
            religious_character_code: Some("02".to_string()),
            nursery_provision_code: Some("9".to_string()),
            school_capacity: Some(210),
            ..SchoolDetail::default()
        }
        .insert(&pool)
        .await
        .unwrap();

        for (id, name) in [("p1", "North Trust"), ("p2", "Amber SCITT")] {
            Provider {
                id: id.to_string(),
                operating_name: name.to_string(),
                legal_name: None,
                ukprn: None,
                urn: None,
            }
            .insert(&pool)
            .await
            .unwrap();
        }
        for (id, code, name) in [("ay23", "2023", "2023 to 2024"), ("ay24", "2024", "2024 to 2025")] {
            AcademicYear {
                id: id.to_string(),
                code: code.to_string(),
                name: name.to_string(),
            }
            .insert(&pool)
            .await
            .unwrap();
        }
        for (id, provider, year) in [("ps1", "p1", "ay23"), ("ps2", "p1", "ay24"), ("ps3", "p2", "ay24")] {
            Placement {
                id: id.to_string(),
                school_id: "s-001".to_string(),
                provider_id: provider.to_string(),
                academic_year_id: year.to_string(),
            }
            .insert(&pool)
            .await
            .unwrap();
        }

        pool
    }

    #[tokio::test]
    async fn test_school_details_resolve_characteristics() {
        let dir = TempDir::new().unwrap();
        let pool = seeded(&dir).await;

        let details = fetch_school_details(&pool, "s-001").await.unwrap().unwrap();

        assert_eq!(details.school.name, "Elm Grove Primary");
        assert_eq!(details.school.school_type.as_deref(), Some("Academy"));
        assert_eq!(
            details.characteristics,
            SchoolCharacteristics {
                admissions_policy: Some("Non-selective".to_string()),
                boarder: None,
                gender: Some("Mixed".to_string()),
                nursery_provision: Some("Unknown (9)".to_string()),
                religious_character: Some("Church of England".to_string()),
                capacity: Some(210),
            }
        );
    }

    #[tokio::test]
    async fn test_school_details_group_partnerships_latest_year_first() {
        let dir = TempDir::new().unwrap();
        let pool = seeded(&dir).await;

        let details = fetch_school_details(&pool, "s-001").await.unwrap().unwrap();

        let years: Vec<&str> = details.academic_years.iter().map(|y| y.name.as_str()).collect();
        assert_eq!(years, vec!["2024 to 2025", "2023 to 2024"]);
        let latest: Vec<&str> = details.academic_years[0]
            .providers
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(latest, vec!["Amber SCITT", "North Trust"]);
    }

    #[tokio::test]
    async fn test_unknown_school_has_no_details() {
        let dir = TempDir::new().unwrap();
        let pool = seeded(&dir).await;

        assert!(fetch_school_details(&pool, "s-404").await.unwrap().is_none());
    }
}
