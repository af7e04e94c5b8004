//! Per-step decision and execution

use crate::cancel::CancellationToken;
use crate::error::{MigrateError, MigrateResult};
use crate::journal::{JournalEntry, JournalRow, JournalStore};
use crate::result::{duration_ms as millis, StepResult};
use std::time::{Duration, Instant};
use wm_core::{compute_checksum, split_statements, DriftPolicy, MigrationStep};
use wm_db::Database;

/// What to do with a step that is not already applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Run the SQL
    Apply,

    /// Probe says present, checksum changed, policy says run it again
    Reapply { previous_checksum: String },

    /// Probe says present, checksum changed, policy says leave it
    SkipDrift { previous_checksum: String },

    /// Probe says present and the journal has never seen the step
    Adopt,

    /// Probe says present and the journal has a failed row with the same
    /// checksum
    SkipPresent,
}

/// Drift under [`DriftPolicy::Fail`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftFailure {
    pub previous_checksum: String,
    pub current_checksum: String,
}

/// A successful journal row with the same checksum means nothing to do.
pub fn is_already_applied(prior: Option<&JournalRow>, checksum: &str) -> bool {
    prior.is_some_and(|row| row.success && row.checksum == checksum)
}

/// Pick the action for a step that is not already applied.
///
/// `probe` is the check SQL result, or false when the step has none.
pub fn decide(
    prior: Option<&JournalRow>,
    checksum: &str,
    probe: bool,
    policy: DriftPolicy,
) -> Result<StepAction, DriftFailure> {
    if !probe {
        return Ok(StepAction::Apply);
    }

    match prior {
        None => Ok(StepAction::Adopt),
        Some(row) if row.checksum != checksum => {
            let previous_checksum = row.checksum.clone();
            match policy {
                DriftPolicy::Fail => Err(DriftFailure {
                    previous_checksum,
                    current_checksum: checksum.to_string(),
                }),
                DriftPolicy::WarnAndSkip => Ok(StepAction::SkipDrift { previous_checksum }),
                DriftPolicy::Reapply => Ok(StepAction::Reapply { previous_checksum }),
            }
        }
        Some(_) => Ok(StepAction::SkipPresent),
    }
}

/// Runs single steps against one session and journals the outcome
pub struct StepExecutor<'a, D: Database + ?Sized> {
    db: &'a D,
    journal: &'a JournalStore<'a, D>,
    policy: DriftPolicy,
    cancel: &'a CancellationToken,
}

impl<'a, D: Database + ?Sized> StepExecutor<'a, D> {
    pub fn new(
        db: &'a D,
        journal: &'a JournalStore<'a, D>,
        policy: DriftPolicy,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            db,
            journal,
            policy,
            cancel,
        }
    }

    /// Process one step.
    ///
    /// Step-level failures are journaled with `success = false` and returned
    /// as a failed [`StepResult`]. Only fatal errors (journal writes,
    /// cancellation) come back as `Err`.
    pub async fn execute(&self, step: &MigrationStep) -> MigrateResult<StepResult> {
        let start = Instant::now();
        let checksum = compute_checksum(&step.sql);

        match self.process(step, &checksum, start).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                let duration = start.elapsed();
                let message = e.to_string();
                log::error!("Step {} failed: {}", step.label(), message);
                self.journal
                    .upsert(&JournalEntry {
                        step_id: step.id.as_str(),
                        step_name: &step.name,
                        checksum: &checksum,
                        success: false,
                        duration_ms: millis(duration),
                        message: Some(&message),
                    })
                    .await?;
                Ok(StepResult::failed(step, &checksum, duration, message))
            }
        }
    }

    async fn process(
        &self,
        step: &MigrationStep,
        checksum: &str,
        start: Instant,
    ) -> MigrateResult<StepResult> {
        self.cancel.check()?;
        let prior = self.journal.get(step.id.as_str()).await?;
        if is_already_applied(prior.as_ref(), checksum) {
            log::debug!("Step {} already applied", step.label());
            return Ok(StepResult::skipped(step, checksum, start.elapsed()));
        }

        let probe = match &step.check_sql {
            Some(check) => {
                self.cancel.check()?;
                let present =
                    self.db
                        .query_bool(check)
                        .await
                        .map_err(|source| MigrateError::Probe {
                            step_id: step.id.to_string(),
                            source,
                        })?;
                log::debug!("Check probe for step {} returned {}", step.id, present);
                present
            }
            None => false,
        };

        let action = decide(prior.as_ref(), checksum, probe, self.policy).map_err(|drift| {
            MigrateError::Drift {
                step_id: step.id.to_string(),
                previous: drift.previous_checksum,
                current: drift.current_checksum,
            }
        })?;

        match action {
            StepAction::Apply => {
                self.apply(step, checksum, start).await?;
                let duration = start.elapsed();
                log::info!("Applied step {} in {}ms", step.label(), millis(duration));
                Ok(StepResult::applied(step, checksum, duration))
            }
            StepAction::Reapply { previous_checksum } => {
                log::warn!(
                    "Step {} changed since it was applied (journal {}, script {}); re-applying",
                    step.label(),
                    previous_checksum,
                    checksum
                );
                self.apply(step, checksum, start).await?;
                Ok(StepResult::applied(step, checksum, start.elapsed())
                    .with_drift()
                    .with_message(format!(
                        "re-applied after drift from checksum {}",
                        previous_checksum
                    )))
            }
            StepAction::SkipDrift { previous_checksum } => {
                let message = format!(
                    "drift detected: journal checksum {}, script checksum {}; skipped",
                    previous_checksum, checksum
                );
                log::warn!("Step {}: {}", step.label(), message);
                let duration = start.elapsed();
                self.record_success(step, checksum, duration, Some(&message))
                    .await?;
                Ok(StepResult::skipped(step, checksum, duration)
                    .with_drift()
                    .with_message(message))
            }
            StepAction::Adopt => {
                let message = "adopted: check reports the step is already present";
                log::info!("Step {} {}", step.label(), message);
                self.record_success(step, checksum, Duration::ZERO, Some(message))
                    .await?;
                Ok(StepResult::skipped(step, checksum, Duration::ZERO).with_message(message))
            }
            StepAction::SkipPresent => {
                log::warn!(
                    "Step {} last failed, but its check now reports it present; skipping",
                    step.label()
                );
                Ok(StepResult::skipped(step, checksum, start.elapsed()))
            }
        }
    }

    /// Run every statement of the step in one transaction and journal success
    async fn apply(&self, step: &MigrationStep, checksum: &str, start: Instant) -> MigrateResult<()> {
        let statements = split_statements(&step.sql);
        log::debug!("Step {} has {} statements", step.id, statements.len());

        self.cancel.check()?;
        self.db
            .begin()
            .await
            .map_err(|source| MigrateError::Transaction {
                step_id: step.id.to_string(),
                source,
            })?;

        for (i, statement) in statements.iter().enumerate() {
            if let Err(e) = self.run_statement(step, i + 1, statement).await {
                self.rollback(step).await;
                return Err(e);
            }
        }

        if let Err(source) = self.db.commit().await {
            self.rollback(step).await;
            return Err(MigrateError::Transaction {
                step_id: step.id.to_string(),
                source,
            });
        }

        self.record_success(step, checksum, start.elapsed(), None)
            .await
    }

    async fn run_statement(
        &self,
        step: &MigrationStep,
        index: usize,
        statement: &str,
    ) -> MigrateResult<()> {
        self.cancel.check()?;
        log::trace!("Step {} statement {}: {}", step.id, index, statement);
        self.db
            .execute_batch(statement)
            .await
            .map_err(|source| MigrateError::Statement {
                step_id: step.id.to_string(),
                index,
                source,
            })
    }

    async fn rollback(&self, step: &MigrationStep) {
        if let Err(e) = self.db.rollback().await {
            log::warn!("Rollback of step {} failed: {}", step.id, e);
        }
    }

    async fn record_success(
        &self,
        step: &MigrationStep,
        checksum: &str,
        duration: Duration,
        message: Option<&str>,
    ) -> MigrateResult<()> {
        self.journal
            .upsert(&JournalEntry {
                step_id: step.id.as_str(),
                step_name: &step.name,
                checksum,
                success: true,
                duration_ms: millis(duration),
                message,
            })
            .await
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
