//! Lookup-table labels and filter options

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::filters::Facet;
use crate::labels::{fallback_label, FilterOption, LabelResolver};

/// Resolves facet codes against the lookup tables
#[derive(Clone)]
pub struct SqlLabelResolver {
    pool: SqlitePool,
}

impl SqlLabelResolver {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LabelResolver for SqlLabelResolver {
    async fn label(&self, facet: Facet, code: &str) -> String {
        // Table name comes from a closed enum
        let sql = format!("SELECT name FROM {} WHERE code = ?", facet.lookup_table());

        match sqlx::query_scalar::<_, String>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(Some(name)) => name,
            Ok(None) => fallback_label(code),
            Err(e) => {
                warn!(facet = facet.key(), code, error = %e, "Label lookup failed");
                fallback_label(code)
            }
        }
    }
}

/// Options for one facet, ordered by rank then name
pub async fn fetch_options(pool: &SqlitePool, facet: Facet) -> Result<Vec<FilterOption>, sqlx::Error> {
    let sql = format!(
        "SELECT code, name FROM {} ORDER BY rank ASC, name ASC",
        facet.lookup_table()
    );

    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    Ok(rows
        .iter()
        .map(|row| FilterOption {
            value: row.get("code"),
            text: row.get("name"),
        })
        .collect())
}
