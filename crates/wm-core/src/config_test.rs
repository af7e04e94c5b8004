use super::*;

#[test]
fn test_parse_empty_config_uses_defaults() {
    let config: MigrationConfig = serde_yaml::from_str("{}").unwrap();
    assert_eq!(config.migrations, "migrations.sql");
    assert_eq!(config.database.db_type, DbType::DuckDb);
    assert_eq!(config.database.path, "waymark.duckdb");
    assert_eq!(config.migration, MigrationOptions::default());
}

#[test]
fn test_option_defaults() {
    let options = MigrationOptions::default();
    assert_eq!(options.lock_key, DEFAULT_LOCK_KEY);
    assert_eq!(options.statement_timeout_secs, 120);
    assert_eq!(options.statement_timeout(), Duration::from_secs(120));
    assert_eq!(options.drift_policy, DriftPolicy::WarnAndSkip);
    assert!(options.stop_on_error);
    assert_eq!(options.journal_table, DEFAULT_JOURNAL_TABLE);
    assert!(options.journal_schema.is_none());
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
migrations: db/schema.sql
database:
  type: postgres
  url: "postgres://app@localhost/app"
migration:
  lock_key: "orders-service"
  statement_timeout_secs: 30
  drift_policy: reapply
  stop_on_error: false
  journal_table: schema_journal
  journal_schema: ops
"#;
    let config: MigrationConfig = serde_yaml::from_str(yaml).unwrap();
    config.validate().unwrap();
    assert_eq!(config.migrations, "db/schema.sql");
    assert_eq!(config.database.db_type, DbType::Postgres);
    assert_eq!(config.migration.lock_key, "orders-service");
    assert_eq!(config.migration.drift_policy, DriftPolicy::Reapply);
    assert!(!config.migration.stop_on_error);
    assert_eq!(config.migration.journal_schema.as_deref(), Some("ops"));
}

#[test]
fn test_unknown_drift_policy_is_rejected() {
    let yaml = "migration:\n  drift_policy: ignore\n";
    assert!(serde_yaml::from_str::<MigrationConfig>(yaml).is_err());
}

#[test]
fn test_unknown_field_is_rejected() {
    assert!(serde_yaml::from_str::<MigrationConfig>("colour: blue").is_err());
}

#[test]
fn test_drift_policy_from_str() {
    assert_eq!("fail".parse::<DriftPolicy>().unwrap(), DriftPolicy::Fail);
    assert_eq!(
        "warn-and-skip".parse::<DriftPolicy>().unwrap(),
        DriftPolicy::WarnAndSkip
    );
    assert_eq!("REAPPLY".parse::<DriftPolicy>().unwrap(), DriftPolicy::Reapply);
    assert!(matches!(
        "never".parse::<DriftPolicy>(),
        Err(CoreError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_validate_rejects_zero_timeout() {
    let options = MigrationOptions {
        statement_timeout_secs: 0,
        ..Default::default()
    };
    assert!(matches!(
        options.validate(),
        Err(CoreError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_validate_rejects_empty_journal_table() {
    let options = MigrationOptions {
        journal_table: "  ".to_string(),
        ..Default::default()
    };
    assert!(options.validate().is_err());
}

#[test]
fn test_validate_rejects_postgres_without_url() {
    let config: MigrationConfig = serde_yaml::from_str("database:\n  type: postgres\n").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_load_from_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("waymark.yml"),
        "migrations: schema.sql\nmigration:\n  drift_policy: fail\n",
    )
    .unwrap();

    let config = MigrationConfig::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.migration.drift_policy, DriftPolicy::Fail);
    assert_eq!(
        config.migrations_path_absolute(dir.path()),
        dir.path().join("schema.sql")
    );
}

#[test]
fn test_load_from_dir_missing() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        MigrationConfig::load_from_dir(dir.path()),
        Err(CoreError::ConfigNotFound { .. })
    ));
}

#[test]
fn test_load_reports_parse_error_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("waymark.yml");
    std::fs::write(&path, "migration: [not, a, map]\n").unwrap();

    match MigrationConfig::load(&path) {
        Err(CoreError::ConfigParseError { message }) => {
            assert!(message.contains("waymark.yml"));
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}
