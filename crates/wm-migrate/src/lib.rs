//! wm-migrate - Migration engine for Waymark
//!
//! Applies the steps of a migration script exactly once, in file order,
//! behind a database-wide advisory lock. Every step outcome is recorded in a
//! journal table together with the checksum of the SQL that produced it, so
//! later runs can skip unchanged steps and notice edited ones.

pub mod cancel;
pub mod error;
pub mod executor;
pub mod journal;
pub mod result;
pub mod runner;

pub use cancel::CancellationToken;
pub use error::{MigrateError, MigrateResult};
pub use executor::{decide, is_already_applied, DriftFailure, StepAction, StepExecutor};
pub use journal::{JournalEntry, JournalRow, JournalStore};
pub use result::{MigrationResult, StepResult};
pub use runner::{MigrationRunner, RunPhase};
