use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Every variable the binary reads, with its template value.
pub const ENV_VARS: &[(&str, &str)] = &[
    ("DB_HOST", "127.0.0.1"),
    ("DB_PORT", "5432"),
    ("DB_USER", "postgres"),
    ("DB_PASSWORD", ""),
    ("DB_NAME", "postgres"),
    ("OPENAI_API_KEY", ""),
    ("OPENAI_MODEL", "gpt-4"),
    ("ENTITY_MATCHER_RAYON_THREADS", ""),
    ("ENTITY_MATCHER_POOL_SIZE", "4"),
    ("ENTITY_MATCHER_ACQUIRE_MS", "10000"),
    ("RUST_LOG", "info"),
];

/// Loads `.env` from the working directory when present. Variables already
/// set in the environment win.
pub fn load_dotenv_if_present() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            log::debug!("Loaded environment from {}", path.display());
            Ok(())
        }
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e).context("Failed to read .env"),
    }
}

pub fn write_env_template(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut out = String::from("# entity_matcher environment. Copy to .env and edit.\n");
    for (k, v) in ENV_VARS {
        out.push_str(k);
        out.push('=');
        out.push_str(v);
        out.push('\n');
    }
    fs::write(path, out).with_context(|| format!("Failed to write {}", path.display()))
}

/// Reads a dotenv-style file without touching the process environment.
pub fn parse_env_file(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    let iter = dotenvy::from_path_iter(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut map = BTreeMap::new();
    for item in iter {
        let (k, v) = item.with_context(|| format!("Bad line in {}", path.display()))?;
        map.insert(k, v);
    }
    Ok(map)
}
