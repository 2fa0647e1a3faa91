//! Database initialization
//!
//! Creates the placement schema on first run. Every statement is
//! `CREATE ... IF NOT EXISTS`, so initialization is safe to repeat.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Lookup tables holding `code -> name` labels, in creation order
pub const LOOKUP_TABLES: [&str; 10] = [
    "school_types",
    "school_groups",
    "school_statuses",
    "school_education_phases",
    "regions",
    "school_admissions_policies",
    "school_boarders",
    "school_genders",
    "school_nursery_provisions",
    "school_religious_characters",
];

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    for table in LOOKUP_TABLES {
        create_lookup_table(pool, table).await?;
    }

    create_schools_table(pool).await?;
    create_school_addresses_table(pool).await?;
    create_school_details_table(pool).await?;
    create_providers_table(pool).await?;
    create_academic_years_table(pool).await?;
    create_placement_schools_table(pool).await?;
    create_indexes(pool).await?;

    Ok(())
}

async fn create_lookup_table(pool: &SqlitePool, table: &str) -> Result<()> {
    // Table names come from LOOKUP_TABLES only
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            rank INTEGER NOT NULL DEFAULT 0
        )
        "#
    ))
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_schools_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schools (
            id TEXT PRIMARY KEY,
            urn TEXT NOT NULL,
            ukprn TEXT,
            name TEXT NOT NULL,
            type_code TEXT NOT NULL,
            group_code TEXT NOT NULL,
            status_code TEXT NOT NULL,
            education_phase_code TEXT NOT NULL,
            website TEXT,
            telephone TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            deleted_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_school_addresses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS school_addresses (
            id TEXT PRIMARY KEY,
            school_id TEXT NOT NULL REFERENCES schools(id),
            line_1 TEXT NOT NULL,
            line_2 TEXT,
            line_3 TEXT,
            town TEXT NOT NULL,
            county TEXT,
            postcode TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            deleted_at TIMESTAMP,
            CHECK ((latitude IS NULL) = (longitude IS NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_school_details_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS school_details (
            id TEXT PRIMARY KEY,
            school_id TEXT NOT NULL REFERENCES schools(id),
            region_code TEXT,
            statutory_low_age INTEGER,
            statutory_high_age INTEGER,
            admissions_policy_code TEXT,
            boarder_code TEXT,
            gender_code TEXT,
            nursery_provision_code TEXT,
            religious_character_code TEXT,
            school_capacity INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            deleted_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_providers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS providers (
            id TEXT PRIMARY KEY,
            operating_name TEXT NOT NULL,
            legal_name TEXT,
            type_code TEXT,
            ukprn TEXT,
            urn TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            deleted_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_academic_years_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS academic_years (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            deleted_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_placement_schools_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS placement_schools (
            id TEXT PRIMARY KEY,
            school_id TEXT NOT NULL REFERENCES schools(id),
            provider_id TEXT NOT NULL REFERENCES providers(id),
            academic_year_id TEXT NOT NULL REFERENCES academic_years(id),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            deleted_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_school_addresses_school ON school_addresses(school_id)",
        "CREATE INDEX IF NOT EXISTS idx_school_addresses_position ON school_addresses(latitude, longitude)",
        "CREATE INDEX IF NOT EXISTS idx_school_details_school ON school_details(school_id)",
        "CREATE INDEX IF NOT EXISTS idx_placement_schools_school ON placement_schools(school_id)",
        "CREATE INDEX IF NOT EXISTS idx_placement_schools_provider ON placement_schools(provider_id)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
