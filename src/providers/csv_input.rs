use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::{RegistryRecord, SourceRecord};

#[derive(Debug, Deserialize)]
struct SourceRow {
    domain: String,
    #[serde(alias = "company_name")]
    name: String,
    #[serde(default, alias = "abn")]
    id_candidate: Option<String>,
    #[serde(default)]
    postcode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegistryRow {
    #[serde(alias = "abn")]
    registry_id: String,
    #[serde(alias = "entity_name")]
    name: String,
    #[serde(default, alias = "type")]
    entity_type: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    postcode: Option<String>,
}

/// Reads cleaned web records. Accepts either the record field names or the
/// crawl table's column names (`company_name`, `abn`).
pub fn load_source_csv(path: impl AsRef<Path>) -> Result<Vec<SourceRecord>> {
    let path = path.as_ref();
    let mut rdr = csv::Reader::from_path(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut out = Vec::new();
    for (line, row) in rdr.deserialize::<SourceRow>().enumerate() {
        let row = row.with_context(|| format!("Bad source row {} in {}", line + 2, path.display()))?;
        out.push(SourceRecord {
            domain: row.domain,
            name: row.name,
            id_candidate: row.id_candidate.filter(|s| !s.trim().is_empty()),
            postcode: row.postcode.unwrap_or_default(),
        });
    }
    Ok(out)
}

/// Reads cleaned register records (`abn`/`entity_name` headers accepted).
pub fn load_registry_csv(path: impl AsRef<Path>) -> Result<Vec<RegistryRecord>> {
    let path = path.as_ref();
    let mut rdr = csv::Reader::from_path(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut out = Vec::new();
    for (line, row) in rdr.deserialize::<RegistryRow>().enumerate() {
        let row = row.with_context(|| format!("Bad registry row {} in {}", line + 2, path.display()))?;
        out.push(RegistryRecord {
            registry_id: row.registry_id,
            name: row.name,
            entity_type: row.entity_type.unwrap_or_default(),
            state: row.state.unwrap_or_default(),
            postcode: row.postcode.unwrap_or_default(),
        });
    }
    Ok(out)
}
