//! Error types for the migration engine.

use thiserror::Error;
use wm_core::CoreError;
use wm_db::DbError;

/// Migration engine errors.
///
/// Errors raised while processing a single step are recorded in the journal
/// and reported in that step's result. Errors for which [`is_fatal`]
/// returns true abort the whole run instead.
///
/// [`is_fatal`]: MigrateError::is_fatal
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration or migration source failure (W001).
    #[error("[W001] {0}")]
    Core(#[from] CoreError),

    /// Session setup failed (W002).
    #[error("[W002] Failed to prepare database session: {0}")]
    Session(#[source] DbError),

    /// Advisory lock could not be taken or released (W003).
    #[error("[W003] Advisory lock {key} failed: {source}")]
    Lock { key: i64, source: DbError },

    /// Journal table could not be created (W004).
    #[error("[W004] Failed to prepare journal table: {0}")]
    JournalSetup(#[source] DbError),

    /// Recording a step outcome failed (W005).
    #[error("[W005] Failed to write journal entry for step '{step_id}': {source}")]
    JournalWrite { step_id: String, source: DbError },

    /// Reading the prior journal entry failed (W006).
    #[error("[W006] Failed to read journal entry for step '{step_id}': {source}")]
    JournalRead { step_id: String, source: DbError },

    /// Journal row could not be decoded (W007).
    #[error("[W007] Journal entry for step '{step_id}' is malformed: {message}")]
    JournalCorrupt { step_id: String, message: String },

    /// Check probe failed to run (W008).
    #[error("[W008] Check probe for step '{step_id}' failed: {source}")]
    Probe { step_id: String, source: DbError },

    /// A statement inside the step failed (W009).
    #[error("[W009] Statement {index} of step '{step_id}' failed: {source}")]
    Statement {
        step_id: String,
        index: usize,
        source: DbError,
    },

    /// Transaction control around the step failed (W010).
    #[error("[W010] Transaction for step '{step_id}' failed: {source}")]
    Transaction { step_id: String, source: DbError },

    /// Step content changed since it was applied and the policy is `fail` (W011).
    #[error(
        "[W011] Drift detected for step '{step_id}': journal checksum {previous}, script checksum {current}"
    )]
    Drift {
        step_id: String,
        previous: String,
        current: String,
    },

    /// The run was cancelled (W012).
    #[error("[W012] Migration run cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Whether this error ends the run rather than failing a single step.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MigrateError::Core(_)
                | MigrateError::Session(_)
                | MigrateError::Lock { .. }
                | MigrateError::JournalSetup(_)
                | MigrateError::JournalWrite { .. }
                | MigrateError::Cancelled
        )
    }
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;
