//! Locked migration run

use crate::cancel::CancellationToken;
use crate::error::{MigrateError, MigrateResult};
use crate::executor::StepExecutor;
use crate::journal::JournalStore;
use crate::result::{MigrationResult, StepResult};
use chrono::Utc;
use std::collections::HashSet;
use std::fmt;
use std::time::Instant;
use uuid::Uuid;
use wm_core::{advisory_lock_key, MigrationOptions, MigrationSource, StepParser};
use wm_db::Database;

/// Lifecycle of a run, reported in debug logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    NotStarted,
    LockAcquired,
    JournalEnsured,
    Iterating,
    LockReleased,
    Completed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunPhase::NotStarted => "not started",
            RunPhase::LockAcquired => "lock acquired",
            RunPhase::JournalEnsured => "journal ensured",
            RunPhase::Iterating => "iterating steps",
            RunPhase::LockReleased => "lock released",
            RunPhase::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

/// Applies a migration source to one database session.
///
/// The session must stay open for the whole run: the advisory lock, the
/// statement timeout and every step transaction live on it.
pub struct MigrationRunner<'a, D: Database + ?Sized> {
    db: &'a D,
    options: MigrationOptions,
    cancel: CancellationToken,
}

impl<'a, D: Database + ?Sized> MigrationRunner<'a, D> {
    pub fn new(db: &'a D, options: MigrationOptions) -> Self {
        Self {
            db,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Observe `token` instead of a private one
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &MigrationOptions {
        &self.options
    }

    /// Apply every step of `source`, in order.
    ///
    /// The source is opened before the lock is taken, so a missing file
    /// fails without touching the database. Once taken, the lock is released
    /// on every exit path.
    pub async fn run(&self, source: &dyn MigrationSource) -> MigrateResult<MigrationResult> {
        self.options.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        self.enter(run_id, RunPhase::NotStarted);

        let lines = source.lines().await?;
        let parser = StepParser::new(lines).with_source_name(source.describe());

        self.db
            .set_statement_timeout(self.options.statement_timeout())
            .await
            .map_err(MigrateError::Session)?;

        let key = advisory_lock_key(&self.options.lock_key);
        self.acquire_lock(key).await?;
        self.enter(run_id, RunPhase::LockAcquired);
        log::info!(
            "Running migrations from {} (run {})",
            source.describe(),
            run_id
        );

        let outcome = self.run_locked(run_id, parser).await;
        let released = self.db.release_advisory_lock(key).await;
        self.enter(run_id, RunPhase::LockReleased);

        let results = match (outcome, released) {
            (Ok(results), Ok(())) => results,
            (Ok(_), Err(source)) => return Err(MigrateError::Lock { key, source }),
            (Err(e), Err(release_err)) => {
                log::error!(
                    "Failed to release advisory lock {} after error: {}",
                    key,
                    release_err
                );
                return Err(e);
            }
            (Err(e), Ok(())) => return Err(e),
        };

        let summary =
            MigrationResult::from_results(run_id, started_at, results, start.elapsed());
        self.enter(run_id, RunPhase::Completed);
        log::info!(
            "Migration run {}: {} applied, {} skipped, {} failed, {} with drift in {}ms",
            run_id,
            summary.steps_applied,
            summary.steps_skipped,
            summary.steps_failed,
            summary.steps_with_drift,
            summary.total_duration_ms
        );
        Ok(summary)
    }

    async fn acquire_lock(&self, key: i64) -> MigrateResult<()> {
        self.cancel.check()?;
        log::debug!(
            "Waiting for advisory lock {} ('{}')",
            key,
            self.options.lock_key
        );

        tokio::select! {
            acquired = self.db.acquire_advisory_lock(key) => {
                acquired.map_err(|source| MigrateError::Lock { key, source })
            }
            _ = self.cancel.cancelled() => {
                // the lock may have been granted as the wait was abandoned
                if let Err(e) = self.db.release_advisory_lock(key).await {
                    log::debug!("Release after cancelled lock wait: {}", e);
                }
                Err(MigrateError::Cancelled)
            }
        }
    }

    async fn run_locked(
        &self,
        run_id: Uuid,
        mut parser: StepParser,
    ) -> MigrateResult<Vec<StepResult>> {
        let journal = JournalStore::from_options(self.db, &self.options);
        journal.ensure_table().await?;
        self.enter(run_id, RunPhase::JournalEnsured);

        let executor = StepExecutor::new(self.db, &journal, self.options.drift_policy, &self.cancel);
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        self.enter(run_id, RunPhase::Iterating);
        while let Some(step) = parser.next_step().await {
            self.cancel.check()?;
            let step = step?;
            if !seen.insert(step.id.clone()) {
                log::warn!(
                    "Step id {} appears more than once; later occurrences overwrite its journal row",
                    step.id
                );
            }

            let result = executor.execute(&step).await?;
            let failed = !result.success;
            results.push(result);

            if failed && self.options.stop_on_error {
                log::warn!("Stopping after failed step {}", step.label());
                break;
            }
        }

        Ok(results)
    }

    fn enter(&self, run_id: Uuid, phase: RunPhase) {
        log::debug!("Run {}: {}", run_id, phase);
    }
}
