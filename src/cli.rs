use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{
    AppConfig, DatabaseConfig, DisambiguationConfig, ExportConfig, MatchingConfig, TableConfig, DEFAULT_MODEL,
    DEFAULT_REGISTRY_TABLE, DEFAULT_RESULTS_TABLE, DEFAULT_SOURCE_TABLE,
};
use crate::error::ConfigError;
use crate::matching::{DEFAULT_CHUNK_SIZE, DEFAULT_FUZZY_THRESHOLD};

#[derive(Parser, Debug)]
#[command(name = "entity_matcher", version, about = "Link web company records to the business register", disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Match the database tables and replace the results table.
    Run(RunArgs),
    /// Match two CSV files.
    Files(FilesArgs),
    /// Write a .env.template listing every supported variable.
    EnvTemplate {
        #[arg(default_value = ".env.template")]
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct DbArgs {
    /// DB host (env: DB_HOST)
    #[arg(long, env = "DB_HOST")]
    pub host: String,
    /// DB port (env: DB_PORT)
    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    pub port: u16,
    /// DB user (env: DB_USER)
    #[arg(long, env = "DB_USER")]
    pub user: String,
    /// DB password (env: DB_PASSWORD)
    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,
    /// Database name (env: DB_NAME)
    #[arg(long, env = "DB_NAME")]
    pub database: String,
    #[arg(long, default_value = DEFAULT_SOURCE_TABLE)]
    pub source_table: String,
    #[arg(long, default_value = DEFAULT_REGISTRY_TABLE)]
    pub registry_table: String,
    #[arg(long, default_value = DEFAULT_RESULTS_TABLE)]
    pub results_table: String,
}

#[derive(Args, Debug)]
pub struct MatchArgs {
    /// Registry rows per round
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
    /// Minimum fuzzy score accepted
    #[arg(long, default_value_t = DEFAULT_FUZZY_THRESHOLD)]
    pub threshold: f64,
    /// Ask the model about records left after fuzzy matching
    #[arg(long)]
    pub llm: bool,
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// Per-call timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub llm_timeout: u64,
    #[arg(long, default_value_t = 8)]
    pub llm_concurrency: usize,
    /// Register candidates shown per prompt
    #[arg(long, default_value_t = 200)]
    pub llm_max_candidates: usize,
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Matches CSV
    #[arg(long)]
    pub out: Option<String>,
    #[arg(long)]
    pub unresolved_out: Option<String>,
    /// Run summary JSON
    #[arg(long)]
    pub stats_out: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub db: DbArgs,
    #[command(flatten)]
    pub matching: MatchArgs,
    #[command(flatten)]
    pub output: OutputArgs,
    /// Leave the results table untouched
    #[arg(long)]
    pub no_store: bool,
}

#[derive(Args, Debug)]
pub struct FilesArgs {
    #[arg(long)]
    pub source: PathBuf,
    #[arg(long)]
    pub registry: PathBuf,
    #[command(flatten)]
    pub matching: MatchArgs,
    #[command(flatten)]
    pub output: OutputArgs,
}

impl MatchArgs {
    fn matching(&self) -> MatchingConfig {
        MatchingConfig { chunk_size: self.chunk_size, fuzzy_threshold: self.threshold }
    }

    fn disambiguation(&self) -> DisambiguationConfig {
        DisambiguationConfig {
            enabled: self.llm,
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            timeout_secs: self.llm_timeout,
            max_concurrency: self.llm_concurrency,
            max_prompt_candidates: self.llm_max_candidates,
        }
    }
}

impl OutputArgs {
    fn export(&self, no_store: bool) -> ExportConfig {
        ExportConfig {
            out_path: self.out.clone(),
            unresolved_path: self.unresolved_out.clone(),
            stats_path: self.stats_out.clone(),
            no_store,
        }
    }
}

impl RunArgs {
    pub fn to_app_config(&self) -> Result<AppConfig, ConfigError> {
        let db = &self.db;
        let cfg = AppConfig {
            database: Some(DatabaseConfig {
                username: db.user.clone(),
                password: db.password.clone(),
                host: db.host.clone(),
                port: db.port,
                database: db.database.clone(),
            }),
            tables: TableConfig {
                source_table: db.source_table.clone(),
                registry_table: db.registry_table.clone(),
                results_table: db.results_table.clone(),
            },
            matching: self.matching.matching(),
            disambiguation: self.matching.disambiguation(),
            export: self.output.export(self.no_store),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

impl FilesArgs {
    pub fn to_app_config(&self) -> Result<AppConfig, ConfigError> {
        let cfg = AppConfig {
            database: None,
            tables: TableConfig::default(),
            matching: self.matching.matching(),
            disambiguation: self.matching.disambiguation(),
            export: self.output.export(true),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_mode_parses() {
        let cli = Cli::try_parse_from([
            "entity_matcher", "files", "--source", "s.csv", "--registry", "r.csv", "--chunk-size", "100", "--out", "m.csv",
        ])
        .unwrap();
        let Command::Files(args) = cli.command else { panic!("expected files") };
        let cfg = args.to_app_config().unwrap();
        assert_eq!(cfg.matching.chunk_size, 100);
        assert!(cfg.database.is_none());
        assert_eq!(cfg.export.out_path.as_deref(), Some("m.csv"));
    }

    #[test]
    fn run_mode_uses_default_tables() {
        let cli = Cli::try_parse_from([
            "entity_matcher", "run", "--host", "h", "--user", "u", "--database", "d", "--no-store",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else { panic!("expected run") };
        let cfg = args.to_app_config().unwrap();
        assert_eq!(cfg.tables.registry_table, DEFAULT_REGISTRY_TABLE);
        assert!(cfg.export.no_store);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let cli = Cli::try_parse_from(["entity_matcher", "files", "--source", "s", "--registry", "r", "--chunk-size", "0"]).unwrap();
        let Command::Files(args) = cli.command else { panic!("expected files") };
        assert!(matches!(args.to_app_config(), Err(ConfigError::OutOfRange { field: "matching.chunk_size", .. })));
    }
}
