use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::schema::validate_ident;
use crate::models::MatchResult;

/// Rows per INSERT; 12 binds each stays well under the protocol limit.
const INSERT_BATCH: usize = 1_000;

/// Replaces `table` with `matches` in one transaction. On failure nothing
/// changes and the call can be retried. An empty set leaves the table alone.
pub async fn store_matches(pool: &PgPool, table: &str, matches: &[MatchResult]) -> Result<usize> {
    validate_ident(table)?;
    if matches.is_empty() {
        log::warn!("No matches to store; leaving {} unchanged", table);
        return Ok(0);
    }

    let mut tx = pool.begin().await.context("Failed to open transaction")?;
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to drop {}", table))?;
    sqlx::query(&create_table_sql(table))
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to create {}", table))?;

    let created_at = Utc::now();
    for batch in matches.chunks(INSERT_BATCH) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} (source_domain, source_name, source_id_candidate, registry_id, registry_name, \
             registry_type, registry_state, registry_postcode, match_method, match_score, match_confidence, created_at) ",
            table
        ));
        qb.push_values(batch, |mut b, m| {
            b.push_bind(&m.source_domain)
                .push_bind(&m.source_name)
                .push_bind(&m.source_id_candidate)
                .push_bind(&m.registry_id)
                .push_bind(&m.registry_name)
                .push_bind(&m.registry_type)
                .push_bind(&m.registry_state)
                .push_bind(&m.registry_postcode)
                .push_bind(m.method.as_str())
                .push_bind(m.score)
                .push_bind(m.confidence.as_str())
                .push_bind(created_at);
        });
        qb.build()
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert {} rows into {}", batch.len(), table))?;
    }
    tx.commit().await.with_context(|| format!("Failed to commit {}", table))?;
    log::info!("Stored {} matches in {}", matches.len(), table);
    Ok(matches.len())
}

pub(crate) fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {} (\
         id SERIAL PRIMARY KEY, \
         source_domain TEXT NOT NULL, \
         source_name TEXT NOT NULL, \
         source_id_candidate TEXT, \
         registry_id TEXT NOT NULL, \
         registry_name TEXT NOT NULL, \
         registry_type TEXT, \
         registry_state TEXT, \
         registry_postcode TEXT, \
         match_method TEXT NOT NULL, \
         match_score DOUBLE PRECISION NOT NULL, \
         match_confidence TEXT NOT NULL, \
         created_at TIMESTAMPTZ NOT NULL DEFAULT NOW())",
        table
    )
}
