//! Persistent record of step outcomes
//!
//! One row per step id, overwritten on every attempt. Rows are read back
//! with every column cast to text so both backends hand over the same shape.

use crate::error::{MigrateError, MigrateResult};
use wm_core::sql_utils::{nullable_literal, string_literal, table_ref};
use wm_core::MigrationOptions;
use wm_db::Database;

const SELECT_COLUMNS: &str = "CAST(step_id AS VARCHAR), \
     CAST(step_name AS VARCHAR), \
     CAST(checksum AS VARCHAR), \
     CAST(applied_at AS VARCHAR), \
     CAST(duration_ms AS VARCHAR), \
     CAST(success AS VARCHAR), \
     CAST(message AS VARCHAR)";

/// A journal row as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalRow {
    pub step_id: String,
    pub step_name: String,
    pub checksum: String,
    /// Server timestamp of the last attempt, rendered by the database
    pub applied_at: String,
    pub duration_ms: i64,
    pub success: bool,
    pub message: Option<String>,
}

impl JournalRow {
    fn from_columns(columns: Vec<Option<String>>) -> Result<Self, String> {
        let mut columns = columns.into_iter();
        let mut next = |name: &str| -> Result<Option<String>, String> {
            columns
                .next()
                .ok_or_else(|| format!("missing column '{}'", name))
        };
        let required = |name: &str, value: Option<String>| -> Result<String, String> {
            value.ok_or_else(|| format!("column '{}' is NULL", name))
        };

        let step_id = required("step_id", next("step_id")?)?;
        let step_name = required("step_name", next("step_name")?)?;
        let checksum = required("checksum", next("checksum")?)?;
        let applied_at = required("applied_at", next("applied_at")?)?;
        let duration_raw = required("duration_ms", next("duration_ms")?)?;
        let success_raw = required("success", next("success")?)?;
        let message = next("message")?;

        let duration_ms = duration_raw
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("duration_ms '{}': {}", duration_raw, e))?;
        let success = parse_bool(&success_raw)
            .ok_or_else(|| format!("success '{}' is not a boolean", success_raw))?;

        Ok(Self {
            step_id,
            step_name,
            checksum,
            applied_at,
            duration_ms,
            success,
            message,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

/// Values for one journal upsert
#[derive(Debug, Clone, Copy)]
pub struct JournalEntry<'a> {
    pub step_id: &'a str,
    pub step_name: &'a str,
    pub checksum: &'a str,
    pub success: bool,
    pub duration_ms: u64,
    pub message: Option<&'a str>,
}

/// Journal table access on one database session
pub struct JournalStore<'a, D: Database + ?Sized> {
    db: &'a D,
    schema: Option<String>,
    table: String,
}

impl<'a, D: Database + ?Sized> JournalStore<'a, D> {
    pub fn new(db: &'a D, schema: Option<&str>, table: &str) -> Self {
        Self {
            db,
            schema: schema.map(str::to_string),
            table: table.to_string(),
        }
    }

    /// Journal location taken from run options
    pub fn from_options(db: &'a D, options: &MigrationOptions) -> Self {
        Self::new(db, options.journal_schema.as_deref(), &options.journal_table)
    }

    /// Quoted, schema-qualified table reference
    pub fn qualified_name(&self) -> String {
        table_ref(self.schema.as_deref(), &self.table)
    }

    /// Create the schema and table when missing
    pub async fn ensure_table(&self) -> MigrateResult<()> {
        if let Some(schema) = &self.schema {
            self.db
                .create_schema_if_not_exists(schema)
                .await
                .map_err(MigrateError::JournalSetup)?;
        }

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
    step_id TEXT PRIMARY KEY,
    step_name TEXT NOT NULL,
    checksum TEXT NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL,
    duration_ms INTEGER NOT NULL,
    success BOOLEAN NOT NULL,
    message TEXT
)",
            self.qualified_name()
        );
        self.db
            .execute_batch(&sql)
            .await
            .map_err(MigrateError::JournalSetup)?;
        log::debug!("Journal table {} is ready", self.qualified_name());
        Ok(())
    }

    /// Row for `step_id`, if the step was ever attempted
    pub async fn get(&self, step_id: &str) -> MigrateResult<Option<JournalRow>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE step_id = {}",
            SELECT_COLUMNS,
            self.qualified_name(),
            string_literal(step_id)
        );
        let row = self
            .db
            .query_row(&sql)
            .await
            .map_err(|source| MigrateError::JournalRead {
                step_id: step_id.to_string(),
                source,
            })?;

        row.map(|columns| {
            JournalRow::from_columns(columns).map_err(|message| MigrateError::JournalCorrupt {
                step_id: step_id.to_string(),
                message,
            })
        })
        .transpose()
    }

    /// Every row, oldest attempt first
    pub async fn list(&self) -> MigrateResult<Vec<JournalRow>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY applied_at, step_id",
            SELECT_COLUMNS,
            self.qualified_name()
        );
        let rows = self
            .db
            .query_rows(&sql)
            .await
            .map_err(|source| MigrateError::JournalRead {
                step_id: "*".to_string(),
                source,
            })?;

        rows.into_iter()
            .map(|columns| {
                JournalRow::from_columns(columns).map_err(|message| {
                    MigrateError::JournalCorrupt {
                        step_id: "*".to_string(),
                        message,
                    }
                })
            })
            .collect()
    }

    /// Insert or overwrite the row for `entry.step_id`, stamping `applied_at`
    /// with the server clock
    pub async fn upsert(&self, entry: &JournalEntry<'_>) -> MigrateResult<()> {
        let duration_ms = i64::try_from(entry.duration_ms).unwrap_or(i64::MAX);
        let sql = format!(
            "INSERT INTO {table} (step_id, step_name, checksum, applied_at, duration_ms, success, message)
VALUES ({id}, {name}, {checksum}, now(), {duration}, {success}, {message})
ON CONFLICT (step_id) DO UPDATE SET
    step_name = EXCLUDED.step_name,
    checksum = EXCLUDED.checksum,
    applied_at = EXCLUDED.applied_at,
    duration_ms = EXCLUDED.duration_ms,
    success = EXCLUDED.success,
    message = EXCLUDED.message",
            table = self.qualified_name(),
            id = string_literal(entry.step_id),
            name = string_literal(entry.step_name),
            checksum = string_literal(entry.checksum),
            duration = duration_ms,
            success = entry.success,
            message = nullable_literal(entry.message),
        );

        self.db
            .execute(&sql)
            .await
            .map_err(|source| MigrateError::JournalWrite {
                step_id: entry.step_id.to_string(),
                source,
            })?;
        log::debug!(
            "Journaled step {} (success={}, {}ms)",
            entry.step_id,
            entry.success,
            entry.duration_ms
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "journal_test.rs"]
mod tests;
