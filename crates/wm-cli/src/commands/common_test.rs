use super::*;
use std::fs;

fn global(project_dir: &Path) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        project_dir: project_dir.display().to_string(),
        config: None,
        file: None,
        database_url: None,
    }
}

#[test]
fn test_load_project_without_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let project = load_project(&global(dir.path())).unwrap();
    assert_eq!(project.config.database.db_type, DbType::DuckDb);
    assert_eq!(
        project.migrations_path(&global(dir.path())),
        dir.path().join("migrations.sql")
    );
}

#[test]
fn test_load_project_reads_config_and_file_override() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("waymark.yml"),
        "migrations: db/all.sql\nmigration:\n  drift_policy: fail\n",
    )
    .unwrap();

    let mut args = global(dir.path());
    let project = load_project(&args).unwrap();
    assert_eq!(
        project.migrations_path(&args),
        dir.path().join("db/all.sql")
    );
    assert_eq!(
        project.config.migration.drift_policy,
        wm_core::DriftPolicy::Fail
    );

    args.file = Some("other.sql".to_string());
    assert_eq!(project.migrations_path(&args), PathBuf::from("other.sql"));
}

#[test]
fn test_load_project_rejects_bad_config() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("waymark.yml"), "unknown_key: 1\n").unwrap();
    assert!(load_project(&global(dir.path())).is_err());
}

#[test]
fn test_database_url_selects_backend() {
    let mut config = MigrationConfig::default();
    apply_database_url(&mut config, "postgres://localhost/app");
    assert_eq!(config.database.db_type, DbType::Postgres);
    assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/app"));

    apply_database_url(&mut config, "local.duckdb");
    assert_eq!(config.database.db_type, DbType::DuckDb);
    assert_eq!(config.database.path, "local.duckdb");
}

#[tokio::test]
async fn test_read_steps_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("migrations.sql");
    fs::write(
        &path,
        "-- @step id:001 name:a\nCREATE TABLE a (id INT);\n-- @step id:002 name:b\nCREATE TABLE b (id INT);\n",
    )
    .unwrap();

    let steps = read_steps(&FileSource::new(&path)).await.unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[1].name, "b");
}

#[tokio::test]
async fn test_read_steps_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(read_steps(&FileSource::new(dir.path().join("nope.sql")))
        .await
        .is_err());
}

#[test]
fn test_calculate_column_widths() {
    let widths = calculate_column_widths(
        &["ID", "NAME"],
        &[vec!["0001".to_string(), "x".to_string()]],
    );
    assert_eq!(widths, vec![4, 4]);
}
