use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};

use crate::config::validate_table_name;
use crate::models::{RegistryRecord, SourceRecord};
use crate::providers::{RegistryProvider, SourceProvider};

pub(crate) fn validate_ident(name: &str) -> Result<()> {
    validate_table_name(name)?;
    Ok(())
}

/// `abn` alone is not unique; the remaining columns make the order total so
/// paging never skips or repeats a duplicate.
const REGISTRY_ORDER: &str = "abn, entity_name, entity_type, state, postcode";

const REGISTRY_COLUMNS: &str = "TRIM(abn::text) AS registry_id, \
     COALESCE(entity_name, '') AS name, \
     COALESCE(entity_type, '') AS entity_type, \
     COALESCE(state, '') AS state, \
     COALESCE(TRIM(postcode::text), '') AS postcode";

/// Web companies table (`domain, company_name, abn, postcode`).
#[derive(Clone)]
pub struct PgSource {
    pool: PgPool,
    table: String,
}

impl PgSource {
    pub fn new(pool: PgPool, table: &str) -> Result<Self> {
        validate_ident(table)?;
        Ok(Self { pool, table: table.to_string() })
    }
}

#[async_trait]
impl SourceProvider for PgSource {
    async fn fetch_all_source_records(&self) -> Result<Vec<SourceRecord>> {
        let sql = format!(
            "SELECT domain, COALESCE(company_name, '') AS name, NULLIF(TRIM(abn::text), '') AS id_candidate, \
             COALESCE(TRIM(postcode::text), '') AS postcode FROM {}",
            self.table
        );
        sqlx::query_as::<Postgres, SourceRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch rows from {}", self.table))
    }
}

/// Register table (`abn, entity_name, entity_type, state, postcode`), read
/// in windows restricted to the postcodes present in the source table.
#[derive(Clone)]
pub struct PgRegistry {
    pool: PgPool,
    table: String,
    source_table: String,
}

impl PgRegistry {
    pub fn new(pool: PgPool, table: &str, source_table: &str) -> Result<Self> {
        validate_ident(table)?;
        validate_ident(source_table)?;
        Ok(Self { pool, table: table.to_string(), source_table: source_table.to_string() })
    }

    pub async fn count(&self) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE postcode IN (SELECT DISTINCT postcode FROM {})",
            self.table, self.source_table
        );
        let cnt: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(cnt)
    }
}

#[async_trait]
impl RegistryProvider for PgRegistry {
    async fn fetch_registry_chunk(&self, offset: usize, limit: usize) -> Result<Vec<RegistryRecord>> {
        let sql = registry_chunk_sql(&self.table, &self.source_table);
        sqlx::query_as::<Postgres, RegistryRecord>(&sql)
            .bind(offset as i64)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch chunk from {} (offset {}, limit {})", self.table, offset, limit))
    }

    async fn lookup_registry_ids(&self, ids: &[String]) -> Result<Vec<RegistryRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {cols} FROM {reg} WHERE REGEXP_REPLACE(abn::text, '[[:space:]-]', '', 'g') = ANY($1) ORDER BY {order}",
            cols = REGISTRY_COLUMNS,
            reg = self.table,
            order = REGISTRY_ORDER
        );
        sqlx::query_as::<Postgres, RegistryRecord>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to look up {} identifiers in {}", ids.len(), self.table))
    }
}

fn registry_chunk_sql(table: &str, source_table: &str) -> String {
    format!(
        "SELECT {cols} FROM {reg} WHERE postcode IN (SELECT DISTINCT postcode FROM {src}) \
         ORDER BY {order} OFFSET $1 LIMIT $2",
        cols = REGISTRY_COLUMNS,
        reg = table,
        src = source_table,
        order = REGISTRY_ORDER
    )
}
