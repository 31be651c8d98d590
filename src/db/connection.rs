use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;

/// Pool sizing can be tuned through `ENTITY_MATCHER_POOL_SIZE` and
/// `ENTITY_MATCHER_ACQUIRE_MS`.
pub async fn make_pool(cfg: &DatabaseConfig) -> Result<PgPool> {
    let url = cfg.to_url();
    // One connection streams the register; a few more cover the lookup and the final store.
    let max_conn: u32 = std::env::var("ENTITY_MATCHER_POOL_SIZE").ok().and_then(|s| s.parse().ok()).filter(|&n| n > 0).unwrap_or(4);
    let acquire_ms: u64 = std::env::var("ENTITY_MATCHER_ACQUIRE_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(10_000);

    let pool = PgPoolOptions::new()
        .max_connections(max_conn)
        .acquire_timeout(Duration::from_millis(acquire_ms))
        .idle_timeout(Some(Duration::from_secs(60)))
        .connect(&url)
        .await
        .with_context(|| format!("Failed to connect to {}:{}/{}", cfg.host, cfg.port, cfg.database))?;
    log::info!("[DB] Connected to {}:{}/{} (max {} connections)", cfg.host, cfg.port, cfg.database, max_conn);
    Ok(pool)
}
