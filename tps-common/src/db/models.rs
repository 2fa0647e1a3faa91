//! Database row models
//!
//! Plain records mirroring the placement tables, with inserts used by
//! data loading tools and test fixtures. The search service itself only reads.

use crate::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Lookup row (`code -> name`) for one of [`super::LOOKUP_TABLES`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupEntry {
    pub code: String,
    pub name: String,
    pub rank: i64,
}

impl LookupEntry {
    pub fn new(code: &str, name: &str, rank: i64) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            rank,
        }
    }

    /// Insert into `table`, which must be one of the lookup tables
    pub async fn insert(&self, pool: &SqlitePool, table: &str) -> Result<()> {
        if !super::LOOKUP_TABLES.contains(&table) {
            return Err(crate::Error::Config(format!("Unknown lookup table: {}", table)));
        }

        sqlx::query(&format!(
            "INSERT OR REPLACE INTO {table} (code, name, rank) VALUES (?, ?, ?)"
        ))
        .bind(&self.code)
        .bind(&self.name)
        .bind(self.rank)
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
    pub id: String,
    pub urn: String,
    pub ukprn: Option<String>,
    pub name: String,
    pub type_code: String,
    pub group_code: String,
    pub status_code: String,
    pub education_phase_code: String,
}

impl School {
    pub async fn insert(&self, pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO schools (id, urn, ukprn, name, type_code, group_code, status_code, education_phase_code)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.urn)
        .bind(&self.ukprn)
        .bind(&self.name)
        .bind(&self.type_code)
        .bind(&self.group_code)
        .bind(&self.status_code)
        .bind(&self.education_phase_code)
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolAddress {
    pub id: String,
    pub school_id: String,
    pub line_1: String,
    pub line_2: Option<String>,
    pub line_3: Option<String>,
    pub town: String,
    pub county: Option<String>,
    pub postcode: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl SchoolAddress {
    pub async fn insert(&self, pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO school_addresses
                (id, school_id, line_1, line_2, line_3, town, county, postcode, latitude, longitude)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.school_id)
        .bind(&self.line_1)
        .bind(&self.line_2)
        .bind(&self.line_3)
        .bind(&self.town)
        .bind(&self.county)
        .bind(&self.postcode)
        .bind(self.latitude)
        .bind(self.longitude)
        .execute(pool)
        .await?;

        Ok(())
    }
}

/// Characteristics of a school; every code column points at a lookup table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchoolDetail {
    pub id: String,
    pub school_id: String,
    pub region_code: Option<String>,
    pub statutory_low_age: Option<i64>,
    pub statutory_high_age: Option<i64>,
    pub admissions_policy_code: Option<String>,
    pub boarder_code: Option<String>,
    pub gender_code: Option<String>,
    pub nursery_provision_code: Option<String>,
    pub religious_character_code: Option<String>,
    pub school_capacity: Option<i64>,
}

impl SchoolDetail {
    pub async fn insert(&self, pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO school_details
                (id, school_id, region_code, statutory_low_age, statutory_high_age,
                 admissions_policy_code, boarder_code, gender_code,
                 nursery_provision_code, religious_character_code, school_capacity)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.school_id)
        .bind(&self.region_code)
        .bind(self.statutory_low_age)
        .bind(self.statutory_high_age)
        .bind(&self.admissions_policy_code)
        .bind(&self.boarder_code)
        .bind(&self.gender_code)
        .bind(&self.nursery_provision_code)
        .bind(&self.religious_character_code)
        .bind(self.school_capacity)
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub operating_name: String,
    pub legal_name: Option<String>,
    pub ukprn: Option<String>,
    pub urn: Option<String>,
}

impl Provider {
    pub async fn insert(&self, pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "INSERT INTO providers (id, operating_name, legal_name, ukprn, urn) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&self.id)
        .bind(&self.operating_name)
        .bind(&self.legal_name)
        .bind(&self.ukprn)
        .bind(&self.urn)
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademicYear {
    pub id: String,
    /// Sortable code, e.g. "2024"
    pub code: String,
    /// Display label, e.g. "2024 to 2025"
    pub name: String,
}

impl AcademicYear {
    pub async fn insert(&self, pool: &SqlitePool) -> Result<()> {
        sqlx::query("INSERT INTO academic_years (id, code, name) VALUES (?, ?, ?)")
            .bind(&self.id)
            .bind(&self.code)
            .bind(&self.name)
            .execute(pool)
            .await?;

        Ok(())
    }
}

/// One (school, provider, academic year) partnership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub id: String,
    pub school_id: String,
    pub provider_id: String,
    pub academic_year_id: String,
}

impl Placement {
    pub async fn insert(&self, pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "INSERT INTO placement_schools (id, school_id, provider_id, academic_year_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&self.id)
        .bind(&self.school_id)
        .bind(&self.provider_id)
        .bind(&self.academic_year_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Soft-delete this placement
    pub async fn soft_delete(pool: &SqlitePool, id: &str) -> Result<()> {
        sqlx::query("UPDATE placement_schools SET deleted_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
