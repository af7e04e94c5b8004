//! Database trait definitions
//!
//! The migration engine holds one session for a whole run. Every method is a
//! database round-trip and an async suspension point.

use crate::error::DbResult;
use async_trait::async_trait;
use std::time::Duration;

/// Statement execution and simple queries
#[async_trait]
pub trait DatabaseCore: Send + Sync {
    /// Execute a single statement, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute SQL text that may hold several statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query and read the first column of the first row as a boolean.
    ///
    /// No rows, or a NULL value, reads as `false`.
    async fn query_bool(&self, sql: &str) -> DbResult<bool>;

    /// Run a query and return the first row with every column as text.
    ///
    /// Callers cast columns to a text type in the query itself so each
    /// backend only has to read strings.
    async fn query_row(&self, sql: &str) -> DbResult<Option<Vec<Option<String>>>>;

    /// Run a query and return all rows with every column as text.
    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<Option<String>>>>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// Catalog inspection and namespace management
#[async_trait]
pub trait DatabaseSchema: Send + Sync {
    /// Check if a table or view exists
    async fn relation_exists(&self, schema: Option<&str>, name: &str) -> DbResult<bool>;

    /// Create a schema if it does not exist
    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()>;
}

/// Explicit transaction control on the session
#[async_trait]
pub trait DatabaseTransaction: Send + Sync {
    /// Open a transaction (read committed where the backend supports it)
    async fn begin(&self) -> DbResult<()>;

    /// Commit the open transaction
    async fn commit(&self) -> DbResult<()>;

    /// Roll back the open transaction
    async fn rollback(&self) -> DbResult<()>;
}

/// Session-scoped settings and advisory locking
#[async_trait]
pub trait DatabaseSession: Send + Sync {
    /// Block until the advisory lock `key` is held by this session
    async fn acquire_advisory_lock(&self, key: i64) -> DbResult<()>;

    /// Release an advisory lock held by this session
    async fn release_advisory_lock(&self, key: i64) -> DbResult<()>;

    /// Bound the duration of each subsequent statement
    async fn set_statement_timeout(&self, timeout: Duration) -> DbResult<()>;
}

/// Everything the migration engine needs from a backend.
pub trait Database: DatabaseCore + DatabaseSchema + DatabaseTransaction + DatabaseSession {}

impl<T> Database for T where T: DatabaseCore + DatabaseSchema + DatabaseTransaction + DatabaseSession
{}
