//! PostgreSQL database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{DatabaseCore, DatabaseSchema, DatabaseSession, DatabaseTransaction};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio_postgres::{Client, NoTls};
use wm_core::sql_utils::{escape_sql_string, quote_ident};

const LOCK_POLL_START: Duration = Duration::from_millis(20);
const LOCK_POLL_MAX: Duration = Duration::from_secs(1);

/// PostgreSQL database backend
///
/// One client connection is one session: transactions, `statement_timeout`
/// and advisory locks all apply to it.
pub struct PostgresBackend {
    client: Client,
    owned_locks: Mutex<HashSet<i64>>,
}

impl PostgresBackend {
    /// Connect using a libpq-style connection string or URL
    pub async fn connect(url: &str) -> DbResult<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::error!("PostgreSQL connection closed with error: {}", e);
            }
        });

        Ok(Self {
            client,
            owned_locks: Mutex::new(HashSet::new()),
        })
    }

    fn owned_locks(&self) -> DbResult<MutexGuard<'_, HashSet<i64>>> {
        self.owned_locks
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    async fn transaction_control(&self, sql: &str) -> DbResult<()> {
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| DbError::TransactionError(format!("{} failed: {}", sql, DbError::from(e))))
    }
}

#[async_trait]
impl DatabaseCore for PostgresBackend {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        let affected = self.client.execute(sql, &[]).await?;
        Ok(affected as usize)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        Ok(self.client.batch_execute(sql).await?)
    }

    async fn query_bool(&self, sql: &str) -> DbResult<bool> {
        let rows = self.client.query(sql, &[]).await?;
        match rows.first() {
            Some(row) => Ok(row.try_get::<_, Option<bool>>(0)?.unwrap_or(false)),
            None => Ok(false),
        }
    }

    async fn query_row(&self, sql: &str) -> DbResult<Option<Vec<Option<String>>>> {
        Ok(self.query_rows(sql).await?.into_iter().next())
    }

    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<Option<String>>>> {
        let rows = self.client.query(sql, &[]).await?;
        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| row.try_get::<_, Option<String>>(i).map_err(DbError::from))
                    .collect::<DbResult<Vec<_>>>()
            })
            .collect()
    }

    fn db_type(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl DatabaseSchema for PostgresBackend {
    async fn relation_exists(&self, schema: Option<&str>, name: &str) -> DbResult<bool> {
        let schema_expr = match schema {
            Some(s) => format!("'{}'", escape_sql_string(s)),
            None => "current_schema()".to_string(),
        };
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_schema = {} AND table_name = '{}')",
            schema_expr,
            escape_sql_string(name)
        );
        self.query_bool(&sql).await
    }

    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()> {
        let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema));
        self.execute_batch(&sql).await
    }
}

#[async_trait]
impl DatabaseTransaction for PostgresBackend {
    async fn begin(&self) -> DbResult<()> {
        self.transaction_control("BEGIN ISOLATION LEVEL READ COMMITTED")
            .await
    }

    async fn commit(&self) -> DbResult<()> {
        self.transaction_control("COMMIT").await
    }

    async fn rollback(&self) -> DbResult<()> {
        self.transaction_control("ROLLBACK").await
    }
}

#[async_trait]
impl DatabaseSession for PostgresBackend {
    /// Polls `pg_try_advisory_lock` instead of blocking in
    /// `pg_advisory_lock`, so the wait is never cut short by
    /// `statement_timeout`.
    async fn acquire_advisory_lock(&self, key: i64) -> DbResult<()> {
        let sql = format!("SELECT pg_try_advisory_lock({})", key);
        let mut delay = LOCK_POLL_START;
        loop {
            if self.query_bool(&sql).await? {
                self.owned_locks()?.insert(key);
                return Ok(());
            }
            log::debug!("Advisory lock {} is held elsewhere, retrying in {:?}", key, delay);
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(LOCK_POLL_MAX);
        }
    }

    async fn release_advisory_lock(&self, key: i64) -> DbResult<()> {
        let released = self
            .query_bool(&format!("SELECT pg_advisory_unlock({})", key))
            .await?;
        self.owned_locks()?.remove(&key);
        if !released {
            log::warn!("Advisory lock {} was not held by this session", key);
        }
        Ok(())
    }

    async fn set_statement_timeout(&self, timeout: Duration) -> DbResult<()> {
        let sql = format!("SET statement_timeout = {}", timeout.as_millis());
        self.execute_batch(&sql).await
    }
}
