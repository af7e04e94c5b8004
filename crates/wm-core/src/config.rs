//! Configuration types and parsing for waymark.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default journal table name
pub const DEFAULT_JOURNAL_TABLE: &str = "wm_migration_journal";

/// Default seed for the advisory lock id
pub const DEFAULT_LOCK_KEY: &str = "waymark:migrations";

/// Default per-statement timeout in seconds
pub const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 120;

/// Project configuration from waymark.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    /// Path to the migration script, relative to the project directory
    #[serde(default = "default_migrations_path")]
    pub migrations: String,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Engine behaviour
    #[serde(default)]
    pub migration: MigrationOptions,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations: default_migrations_path(),
            database: DatabaseConfig::default(),
            migration: MigrationOptions::default(),
        }
    }
}

/// Database type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// DuckDB (default)
    #[default]
    DuckDb,
    /// PostgreSQL
    Postgres,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
            DbType::Postgres => write!(f, "postgres"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database type (duckdb or postgres)
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// Database path (for DuckDB file-based or :memory:)
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Connection string (for PostgreSQL)
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            path: default_db_path(),
            url: None,
        }
    }
}

/// What to do when a step's checksum no longer matches the journal while
/// its check probe says the step is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DriftPolicy {
    /// Fail the step
    Fail,
    /// Record the new checksum without running any SQL
    #[default]
    WarnAndSkip,
    /// Run the step's SQL again
    Reapply,
}

impl std::fmt::Display for DriftPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriftPolicy::Fail => write!(f, "fail"),
            DriftPolicy::WarnAndSkip => write!(f, "warn_and_skip"),
            DriftPolicy::Reapply => write!(f, "reapply"),
        }
    }
}

impl std::str::FromStr for DriftPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "fail" => Ok(DriftPolicy::Fail),
            "warn_and_skip" | "warnandskip" => Ok(DriftPolicy::WarnAndSkip),
            "reapply" => Ok(DriftPolicy::Reapply),
            other => Err(CoreError::ConfigInvalid {
                message: format!(
                    "Unknown drift policy '{}'. Expected one of: fail, warn_and_skip, reapply",
                    other
                ),
            }),
        }
    }
}

/// Options consumed by the migration runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationOptions {
    /// String seed for the cross-process advisory lock id
    #[serde(default = "default_lock_key")]
    pub lock_key: String,

    /// Upper bound for a single SQL statement, in seconds
    #[serde(default = "default_statement_timeout_secs")]
    pub statement_timeout_secs: u64,

    /// Behaviour when drift is detected
    #[serde(default)]
    pub drift_policy: DriftPolicy,

    /// Halt remaining steps after the first failed step
    #[serde(default = "default_true")]
    pub stop_on_error: bool,

    /// Journal table name
    #[serde(default = "default_journal_table")]
    pub journal_table: String,

    /// Optional schema qualifier for the journal table
    #[serde(default)]
    pub journal_schema: Option<String>,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            lock_key: default_lock_key(),
            statement_timeout_secs: default_statement_timeout_secs(),
            drift_policy: DriftPolicy::default(),
            stop_on_error: true,
            journal_table: default_journal_table(),
            journal_schema: None,
        }
    }
}

impl MigrationOptions {
    /// Per-statement timeout as a [`Duration`]
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }

    /// Validate option values
    pub fn validate(&self) -> CoreResult<()> {
        if self.lock_key.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migration.lock_key cannot be empty".to_string(),
            });
        }
        if self.statement_timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "migration.statement_timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.journal_table.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migration.journal_table cannot be empty".to_string(),
            });
        }
        if matches!(&self.journal_schema, Some(s) if s.trim().is_empty()) {
            return Err(CoreError::ConfigInvalid {
                message: "migration.journal_schema cannot be blank when set".to_string(),
            });
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_migrations_path() -> String {
    "migrations.sql".to_string()
}

fn default_db_path() -> String {
    "waymark.duckdb".to_string()
}

fn default_lock_key() -> String {
    DEFAULT_LOCK_KEY.to_string()
}

fn default_statement_timeout_secs() -> u64 {
    DEFAULT_STATEMENT_TIMEOUT_SECS
}

fn default_journal_table() -> String {
    DEFAULT_JOURNAL_TABLE.to_string()
}

impl MigrationConfig {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: MigrationConfig =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: format!("{}: {}", path.display(), e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for waymark.yml or waymark.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("waymark.yml");
        let yaml_path = dir.join("waymark.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: dir.join("waymark.yml").display().to_string(),
            })
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.migrations.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migrations path cannot be empty".to_string(),
            });
        }
        if self.database.db_type == DbType::Postgres && self.database.url.is_none() {
            return Err(CoreError::ConfigInvalid {
                message: "database.url is required for type: postgres".to_string(),
            });
        }
        self.migration.validate()
    }

    /// Absolute path of the migration script for a project root
    pub fn migrations_path_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
