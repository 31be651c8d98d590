use entity_matcher::config::{AppConfig, DatabaseConfig, DisambiguationConfig, MatchingConfig, TableConfig};
use entity_matcher::error::ConfigError;

fn db() -> DatabaseConfig {
    DatabaseConfig { username: "postgres".into(), password: "secret".into(), host: "127.0.0.1".into(), port: 5432, database: "dwh".into() }
}

#[test]
fn defaults_and_validation_ok() {
    let cfg = AppConfig { database: Some(db()), ..Default::default() };
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.matching.chunk_size, 50_000);
    assert_eq!(cfg.matching.fuzzy_threshold, 80.0);
    assert!(!cfg.disambiguation.enabled);
    assert_eq!(cfg.disambiguation.model, "gpt-4");
}

#[test]
fn validation_catches_issues() {
    let bad = AppConfig {
        database: Some(DatabaseConfig { username: "".into(), password: "".into(), host: "".into(), port: 0, database: "".into() }),
        ..Default::default()
    };
    let msg = format!("{}", bad.validate().unwrap_err());
    assert!(msg.contains("missing required field") || msg.contains("out of range"));
}

#[test]
fn threshold_must_stay_below_exact() {
    for t in [-1.0, 100.0, f64::NAN] {
        let cfg = AppConfig { matching: MatchingConfig { chunk_size: 10, fuzzy_threshold: t }, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::OutOfRange { field: "matching.fuzzy_threshold", .. })), "{t}");
    }
    let cfg = AppConfig { matching: MatchingConfig { chunk_size: 10, fuzzy_threshold: 99.99 }, ..Default::default() };
    assert!(cfg.validate().is_ok());
}

#[test]
fn disambiguation_needs_a_key() {
    let mut cfg = AppConfig { disambiguation: DisambiguationConfig { enabled: true, ..Default::default() }, ..Default::default() };
    assert!(matches!(cfg.validate(), Err(ConfigError::MissingField("OPENAI_API_KEY"))));
    cfg.disambiguation.api_key = Some("sk-test".into());
    assert!(cfg.validate().is_ok());
    cfg.disambiguation.max_concurrency = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn table_names_are_checked_in_database_mode() {
    let cfg = AppConfig {
        database: Some(db()),
        tables: TableConfig { results_table: "dwh.matches; DROP TABLE x".into(), ..Default::default() },
        ..Default::default()
    };
    assert!(matches!(cfg.validate(), Err(ConfigError::InvalidIdentifier(_))));
}

#[test]
fn api_key_is_not_serialized() {
    let mut cfg = AppConfig::default();
    cfg.disambiguation.api_key = Some("sk-secret".into());
    let json = serde_json::to_string(&cfg).unwrap();
    assert!(!json.contains("sk-secret"));
}
