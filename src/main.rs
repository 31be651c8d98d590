use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};

use entity_matcher::cli::{Cli, Command};
use entity_matcher::config::AppConfig;
use entity_matcher::db::{make_pool, store_matches, PgRegistry, PgSource};
use entity_matcher::error::ConfigError;
use entity_matcher::export::{export_matches_csv, export_unresolved_csv, write_stats_json};
use entity_matcher::llm::OpenAiDisambiguator;
use entity_matcher::matching::{ProgressUpdate, Resolution, ResolveControl, Resolver};
use entity_matcher::providers::{load_registry_csv, load_source_csv, InMemoryRegistry, InMemorySource, RegistryProvider, SourceProvider};
use entity_matcher::util::envfile::{load_dotenv_if_present, write_env_template};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(e) = load_dotenv_if_present() {
        warn!("{:#}", e);
    }

    let cli = Cli::parse();
    let (cfg, files) = match &cli.command {
        Command::EnvTemplate { path } => {
            if let Err(e) = write_env_template(path) {
                error!("{:#}", e);
                std::process::exit(1);
            }
            println!("Wrote {}. Copy to .env and edit values as needed.", path.display());
            return;
        }
        Command::Run(args) => (args.to_app_config(), None),
        Command::Files(args) => (args.to_app_config(), Some((args.source.clone(), args.registry.clone()))),
    };
    let cfg = match cfg {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };

    let result = match files {
        Some((source, registry)) => run_files(&cfg, &source, &registry).await,
        None => run_db(&cfg).await,
    };
    if let Err(e) = result {
        error!("{:#}", e);
        let code = if e.downcast_ref::<ConfigError>().is_some() { 2 } else { 1 };
        std::process::exit(code);
    }
}

async fn run_db(cfg: &AppConfig) -> Result<()> {
    let db = cfg.database.as_ref().ok_or(ConfigError::MissingField("database"))?;
    info!("Connecting to PostgreSQL at {}:{} / db {}", db.host, db.port, db.database);
    let pool = make_pool(db).await?;
    let source = PgSource::new(pool.clone(), &cfg.tables.source_table)?;
    let registry = PgRegistry::new(pool.clone(), &cfg.tables.registry_table, &cfg.tables.source_table)?;
    match registry.count().await {
        Ok(n) => info!("{} register rows share a postcode with {}", n, cfg.tables.source_table),
        Err(e) => warn!("Could not count register rows: {:#}", e),
    }

    let resolution = resolve(cfg, &source, &registry).await?;
    write_outputs(cfg, &resolution)?;

    if cfg.export.no_store {
        info!("--no-store given; {} left unchanged", cfg.tables.results_table);
    } else if resolution.cancelled {
        warn!("Run was cancelled; not replacing {}", cfg.tables.results_table);
    } else {
        store_matches(&pool, &cfg.tables.results_table, &resolution.matches)
            .await
            .context("Failed to store matches")?;
    }
    Ok(())
}

async fn run_files(cfg: &AppConfig, source: &std::path::Path, registry: &std::path::Path) -> Result<()> {
    let source_rows = load_source_csv(source)?;
    let registry_rows = load_registry_csv(registry)?;
    info!("Loaded {} source and {} register rows", source_rows.len(), registry_rows.len());
    let registry = InMemoryRegistry::new(registry_rows, &source_rows);
    let source = InMemorySource::new(source_rows);
    let resolution = resolve(cfg, &source, &registry).await?;
    write_outputs(cfg, &resolution)
}

async fn resolve(cfg: &AppConfig, source: &dyn SourceProvider, registry: &dyn RegistryProvider) -> Result<Resolution> {
    let ctrl = ResolveControl::new();
    {
        let ctrl = ctrl.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; finishing the current step and stopping");
                ctrl.cancel();
            }
        });
    }

    let mut resolver = Resolver::new(cfg.to_resolve_config()).with_control(ctrl);
    if cfg.disambiguation.enabled {
        let client = OpenAiDisambiguator::from_config(&cfg.disambiguation)?;
        info!("Disambiguation enabled (model {})", cfg.disambiguation.model);
        resolver = resolver.with_disambiguator(Arc::new(client));
    }

    let resolution = resolver
        .run(source, registry, |u: ProgressUpdate| {
            info!(
                "[{}] round {} | offset {} | chunk {} | matched {} | unresolved {} | Mem used: {} MB | Avail: {} MB",
                u.stage.as_str(), u.round, u.offset, u.chunk_len, u.matched, u.unresolved, u.mem_used_mb, u.mem_avail_mb
            );
        })
        .await?;
    resolution.stats.log_summary();
    Ok(resolution)
}

fn write_outputs(cfg: &AppConfig, resolution: &Resolution) -> Result<()> {
    if let Some(path) = &cfg.export.out_path {
        export_matches_csv(&resolution.matches, path)?;
        info!("Wrote {} matches to {}", resolution.matches.len(), path);
    }
    if let Some(path) = &cfg.export.unresolved_path {
        export_unresolved_csv(&resolution.unresolved, path)?;
        info!("Wrote {} unresolved records to {}", resolution.unresolved.len(), path);
    }
    if let Some(path) = &cfg.export.stats_path {
        write_stats_json(&resolution.stats, path)?;
    }
    Ok(())
}
