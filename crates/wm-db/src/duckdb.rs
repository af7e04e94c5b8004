//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::lock::LockRegistry;
use crate::traits::{DatabaseCore, DatabaseSchema, DatabaseSession, DatabaseTransaction};
use async_trait::async_trait;
use duckdb::Connection;
use std::collections::HashSet;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use wm_core::sql_utils::{escape_sql_string, quote_ident};

/// DuckDB database backend
///
/// Holds a single connection. Handles created with
/// [`try_clone`](Self::try_clone) are separate sessions on the same database
/// and share one [`LockRegistry`], so advisory locks exclude each other the
/// way PostgreSQL session locks do.
///
/// DuckDB has no `statement_timeout` setting. A limit passed to
/// [`set_statement_timeout`](DatabaseSession::set_statement_timeout) is
/// enforced by a watchdog thread that interrupts the connection once the
/// deadline passes.
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
    locks: Arc<LockRegistry>,
    owned_locks: Mutex<HashSet<i64>>,
    statement_timeout: Mutex<Option<Duration>>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::with_connection(conn, Arc::new(LockRegistry::new())))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", e, path.display())))?;
        Ok(Self::with_connection(conn, Arc::new(LockRegistry::new())))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Open another session on the same database.
    pub fn try_clone(&self) -> DbResult<Self> {
        let conn = self
            .conn()?
            .try_clone()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::with_connection(conn, Arc::clone(&self.locks)))
    }

    /// Advisory locks shared by every session on this database
    pub fn lock_registry(&self) -> &Arc<LockRegistry> {
        &self.locks
    }

    fn with_connection(conn: Connection, locks: Arc<LockRegistry>) -> Self {
        Self {
            conn: Mutex::new(conn),
            locks,
            owned_locks: Mutex::new(HashSet::new()),
            statement_timeout: Mutex::new(None),
        }
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    fn owned_locks(&self) -> DbResult<MutexGuard<'_, HashSet<i64>>> {
        self.owned_locks
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    fn statement_timeout(&self) -> DbResult<Option<Duration>> {
        self.statement_timeout
            .lock()
            .map(|limit| *limit)
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Run `work` on the connection, interrupting it if it outlives the
    /// statement timeout.
    fn run_limited<T>(
        &self,
        work: impl FnOnce(&Connection) -> duckdb::Result<T>,
    ) -> DbResult<T> {
        let guard = self.conn()?;
        let conn: &Connection = &guard;
        let Some(limit) = self.statement_timeout()? else {
            return Ok(work(conn)?);
        };

        let interrupt = conn.interrupt_handle();
        let (done, finished) = mpsc::channel::<()>();
        let watchdog = thread::Builder::new()
            .name("wm-duckdb-timeout".to_string())
            .spawn(move || match finished.recv_timeout(limit) {
                Err(RecvTimeoutError::Timeout) => {
                    interrupt.interrupt();
                    true
                }
                _ => false,
            })
            .map_err(|e| DbError::ExecutionError(format!("statement watchdog: {}", e)))?;

        let result = work(conn);
        drop(done);
        let timed_out = watchdog.join().unwrap_or(false);

        match result {
            Ok(value) => Ok(value),
            Err(e) if timed_out => Err(DbError::ExecutionError(format!(
                "statement exceeded {}ms timeout: {}",
                limit.as_millis(),
                e
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Execute SQL synchronously
    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        self.run_limited(|conn| conn.execute(sql, []))
    }

    /// Execute batch SQL synchronously
    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        self.run_limited(|conn| conn.execute_batch(sql))
    }

    /// Run a transaction control statement
    fn transaction_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::TransactionError(format!("{} failed: {}", sql, e)))
    }

    /// Query a boolean synchronously
    fn query_bool_sync(&self, sql: &str) -> DbResult<bool> {
        self.run_limited(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let mut rows = stmt.query([])?;
            let value = match rows.next()? {
                Some(row) => row.get::<_, Option<bool>>(0)?.unwrap_or(false),
                None => false,
            };
            Ok(value)
        })
    }

    /// Query rows as text synchronously
    fn query_rows_sync(&self, sql: &str) -> DbResult<Vec<Vec<Option<String>>>> {
        self.run_limited(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map([], |row| {
                    let col_count = row.as_ref().column_count();
                    (0..col_count)
                        .map(|i| row.get::<_, Option<String>>(i))
                        .collect::<Result<Vec<_>, _>>()
                })?
                .collect::<Result<Vec<_>, _>>();
            rows
        })
    }

    /// Check if relation exists synchronously
    fn relation_exists_sync(&self, schema: Option<&str>, name: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = '{}' AND table_name = '{}'",
            escape_sql_string(schema.unwrap_or("main")),
            escape_sql_string(name)
        );
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count > 0)
    }
}

impl Drop for DuckDbBackend {
    fn drop(&mut self) {
        // Session locks end with the session.
        if let Ok(owned) = self.owned_locks.get_mut() {
            for key in owned.drain() {
                if let Err(e) = self.locks.release(key) {
                    log::warn!("Failed to release advisory lock {} on close: {}", key, e);
                }
            }
        }
    }
}

#[async_trait]
impl DatabaseCore for DuckDbBackend {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_sync(sql)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn query_bool(&self, sql: &str) -> DbResult<bool> {
        self.query_bool_sync(sql)
    }

    async fn query_row(&self, sql: &str) -> DbResult<Option<Vec<Option<String>>>> {
        Ok(self.query_rows_sync(sql)?.into_iter().next())
    }

    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<Option<String>>>> {
        self.query_rows_sync(sql)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[async_trait]
impl DatabaseSchema for DuckDbBackend {
    async fn relation_exists(&self, schema: Option<&str>, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(schema, name)
    }

    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()> {
        let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema));
        self.execute_batch_sync(&sql)
    }
}

#[async_trait]
impl DatabaseTransaction for DuckDbBackend {
    async fn begin(&self) -> DbResult<()> {
        // DuckDB transactions are snapshot isolated; there is no weaker level.
        self.transaction_sync("BEGIN TRANSACTION")
    }

    async fn commit(&self) -> DbResult<()> {
        self.transaction_sync("COMMIT")
    }

    async fn rollback(&self) -> DbResult<()> {
        self.transaction_sync("ROLLBACK")
    }
}

#[async_trait]
impl DatabaseSession for DuckDbBackend {
    async fn acquire_advisory_lock(&self, key: i64) -> DbResult<()> {
        self.locks.acquire(key).await?;
        self.owned_locks()?.insert(key);
        Ok(())
    }

    async fn release_advisory_lock(&self, key: i64) -> DbResult<()> {
        if !self.owned_locks()?.remove(&key) {
            log::debug!("Advisory lock {} is not held by this session", key);
            return Ok(());
        }
        self.locks.release(key)?;
        Ok(())
    }

    /// A zero duration disables the limit, as `statement_timeout = 0` does
    /// on PostgreSQL.
    async fn set_statement_timeout(&self, timeout: Duration) -> DbResult<()> {
        let limit = (!timeout.is_zero()).then_some(timeout);
        *self
            .statement_timeout
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))? = limit;
        log::debug!("DuckDB statement timeout set to {:?}", limit);
        Ok(())
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
