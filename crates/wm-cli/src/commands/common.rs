//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use wm_core::{CoreError, DbType, FileSource, MigrationConfig, MigrationStep, StepParser};
use wm_db::{Database, DuckDbBackend};

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that the database session is dropped and its locks released.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only, never shown to the user.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Loaded configuration plus the directory relative paths resolve against
pub(crate) struct Project {
    pub config: MigrationConfig,
    pub root: PathBuf,
}

impl Project {
    /// Migration script path, honouring `--file`
    pub fn migrations_path(&self, global: &GlobalArgs) -> PathBuf {
        match &global.file {
            Some(file) => PathBuf::from(file),
            None => self.config.migrations_path_absolute(&self.root),
        }
    }

    pub fn source(&self, global: &GlobalArgs) -> FileSource {
        FileSource::new(self.migrations_path(global))
    }
}

/// Load `waymark.yml` (or `--config`) and apply global overrides.
///
/// A project directory without a config file runs on defaults.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let (mut config, root) = match &global.config {
        Some(path) => {
            let path = Path::new(path);
            let config = MigrationConfig::load(path).context("Failed to load config")?;
            let root = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (config, root)
        }
        None => {
            let root = PathBuf::from(&global.project_dir);
            match MigrationConfig::load_from_dir(&root) {
                Ok(config) => (config, root),
                Err(CoreError::ConfigNotFound { path }) => {
                    log::info!("No config found at {}, using defaults", path);
                    (MigrationConfig::default(), root)
                }
                Err(e) => return Err(e).context("Failed to load config"),
            }
        }
    };

    if let Some(url) = &global.database_url {
        apply_database_url(&mut config, url);
    }
    config.validate().context("Invalid configuration")?;

    Ok(Project { config, root })
}

/// `postgres://` and `postgresql://` select PostgreSQL; anything else is a
/// DuckDB path.
pub(crate) fn apply_database_url(config: &mut MigrationConfig, url: &str) {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        config.database.db_type = DbType::Postgres;
        config.database.url = Some(url.to_string());
    } else {
        config.database.db_type = DbType::DuckDb;
        config.database.path = url.to_string();
    }
}

/// Open the session the command will use for its whole lifetime
pub(crate) async fn open_database(project: &Project) -> Result<Box<dyn Database>> {
    let database = &project.config.database;
    match database.db_type {
        DbType::DuckDb => {
            let path = if database.path == ":memory:" {
                database.path.clone()
            } else {
                project.root.join(&database.path).display().to_string()
            };
            log::debug!("Opening DuckDB database {}", path);
            let db = DuckDbBackend::new(&path).context("Failed to open DuckDB database")?;
            Ok(Box::new(db))
        }
        DbType::Postgres => open_postgres(database.url.as_deref()).await,
    }
}

#[cfg(feature = "postgres")]
async fn open_postgres(url: Option<&str>) -> Result<Box<dyn Database>> {
    let url = url.context("database.url is required for postgres")?;
    let db = wm_db::PostgresBackend::connect(url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    Ok(Box::new(db))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(_url: Option<&str>) -> Result<Box<dyn Database>> {
    anyhow::bail!("wm was built without PostgreSQL support (enable the `postgres` feature)")
}

/// Parse every step of the script without touching a database
pub(crate) async fn read_steps(source: &FileSource) -> Result<Vec<MigrationStep>> {
    use wm_core::MigrationSource;

    let lines = source
        .lines()
        .await
        .context("Failed to open migration script")?;
    let mut parser = StepParser::new(lines).with_source_name(source.describe());
    let mut steps = Vec::new();
    while let Some(step) = parser.next_step().await {
        steps.push(step.context("Failed to read migration script")?);
    }
    Ok(steps)
}

/// Shorten a checksum for table output
pub(crate) fn short_checksum(checksum: &str) -> String {
    checksum.chars().take(12).collect()
}

/// Calculate column widths for table output.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }
    widths
}

/// Print a left-aligned table with a dashed separator under the header.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths = calculate_column_widths(headers, rows);

    let header_parts: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, &w)| format!("{:<width$}", h, width = w))
        .collect();
    println!("{}", header_parts.join("  ").trim_end());

    let sep_parts: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep_parts.join("  "));

    for row in rows {
        let row_parts: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect();
        println!("{}", row_parts.join("  ").trim_end());
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
