use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::matching::{ResolveConfig, DEFAULT_CHUNK_SIZE, DEFAULT_FUZZY_THRESHOLD};
use crate::models::FUZZY_SCORE_CEILING;

pub const DEFAULT_SOURCE_TABLE: &str = "pre_dwh.cleaned_commoncrawl_companies";
pub const DEFAULT_REGISTRY_TABLE: &str = "pre_dwh.cleaned_abr_companies";
pub const DEFAULT_RESULTS_TABLE: &str = "dwh.dim_entity_match_company_data";
pub const DEFAULT_MODEL: &str = "gpt-4";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConfig {
    pub fn to_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username,
            self.password,
            self.host,
            self.port,
            self.database
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub source_table: String,
    pub registry_table: String,
    pub results_table: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            source_table: DEFAULT_SOURCE_TABLE.into(),
            registry_table: DEFAULT_REGISTRY_TABLE.into(),
            results_table: DEFAULT_RESULTS_TABLE.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub chunk_size: usize,
    pub fuzzy_threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisambiguationConfig {
    pub enabled: bool,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_concurrency: usize,
    pub max_prompt_candidates: usize,
}

impl Default for DisambiguationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: DEFAULT_MODEL.into(),
            api_key: None,
            timeout_secs: 30,
            max_concurrency: 8,
            max_prompt_candidates: 200,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Matches CSV.
    pub out_path: Option<String>,
    pub unresolved_path: Option<String>,
    /// Run summary as JSON.
    pub stats_path: Option<String>,
    /// Skip replacing the results table.
    pub no_store: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Absent in file mode.
    pub database: Option<DatabaseConfig>,
    pub tables: TableConfig,
    pub matching: MatchingConfig,
    pub disambiguation: DisambiguationConfig,
    pub export: ExportConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(db) = &self.database {
            if db.host.trim().is_empty() { return Err(ConfigError::MissingField("database.host")); }
            if db.username.trim().is_empty() { return Err(ConfigError::MissingField("database.username")); }
            if db.database.trim().is_empty() { return Err(ConfigError::MissingField("database.database")); }
            if db.port == 0 {
                return Err(ConfigError::OutOfRange { field: "database.port", value: db.port.to_string() });
            }
            validate_table_name(&self.tables.source_table)?;
            validate_table_name(&self.tables.registry_table)?;
            validate_table_name(&self.tables.results_table)?;
        }

        let m = &self.matching;
        if m.chunk_size == 0 {
            return Err(ConfigError::OutOfRange { field: "matching.chunk_size", value: "0".into() });
        }
        if !(0.0..=FUZZY_SCORE_CEILING).contains(&m.fuzzy_threshold) {
            return Err(ConfigError::OutOfRange { field: "matching.fuzzy_threshold", value: m.fuzzy_threshold.to_string() });
        }

        let d = &self.disambiguation;
        if d.enabled {
            if d.api_key.as_deref().map(str::trim).unwrap_or("").is_empty() {
                return Err(ConfigError::MissingField("OPENAI_API_KEY"));
            }
            if d.model.trim().is_empty() { return Err(ConfigError::MissingField("disambiguation.model")); }
            if d.timeout_secs == 0 {
                return Err(ConfigError::OutOfRange { field: "disambiguation.timeout_secs", value: "0".into() });
            }
            if d.max_concurrency == 0 {
                return Err(ConfigError::OutOfRange { field: "disambiguation.max_concurrency", value: "0".into() });
            }
            if d.max_prompt_candidates == 0 {
                return Err(ConfigError::OutOfRange { field: "disambiguation.max_prompt_candidates", value: "0".into() });
            }
        }
        Ok(())
    }

    pub fn to_resolve_config(&self) -> ResolveConfig {
        ResolveConfig {
            chunk_size: self.matching.chunk_size,
            fuzzy_threshold: self.matching.fuzzy_threshold,
            enable_disambiguation: self.disambiguation.enabled,
            disambiguation_timeout: Duration::from_secs(self.disambiguation.timeout_secs),
            disambiguation_concurrency: self.disambiguation.max_concurrency,
        }
    }
}

/// Accepts `table` or `schema.table`, each part a plain identifier.
pub fn validate_table_name(name: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 || parts.iter().any(|p| !is_plain_ident(p)) {
        return Err(ConfigError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

pub(crate) fn is_plain_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_url() {
        let db = DatabaseConfig { username: "u".into(), password: "p".into(), host: "h".into(), port: 5432, database: "d".into() };
        assert_eq!(db.to_url(), "postgres://u:p@h:5432/d");
    }

    #[test]
    fn table_names() {
        assert!(validate_table_name("pre_dwh.cleaned_abr_companies").is_ok());
        assert!(validate_table_name("matches").is_ok());
        assert!(validate_table_name("a.b.c").is_err());
        assert!(validate_table_name("x; DROP TABLE y").is_err());
        assert!(validate_table_name("1abc").is_err());
        assert!(validate_table_name("").is_err());
    }

    #[test]
    fn resolve_config_follows_app_config() {
        let mut cfg = AppConfig::default();
        cfg.matching.chunk_size = 10;
        cfg.disambiguation.timeout_secs = 5;
        let rc = cfg.to_resolve_config();
        assert_eq!(rc.chunk_size, 10);
        assert_eq!(rc.disambiguation_timeout, Duration::from_secs(5));
        assert!(!rc.enable_disambiguation);
    }
}
