//! wm-core - Core library for Waymark
//!
//! This crate provides the migration step model, configuration parsing,
//! migration script sources, the directive-aware step parser, the SQL
//! statement splitter, and the checksum / advisory-lock-key helpers used
//! across all Waymark components.

pub mod checksum;
pub mod config;
pub mod error;
pub mod parser;
pub mod source;
pub mod splitter;
pub mod sql_utils;
pub mod step;

pub use checksum::{advisory_lock_key, compute_checksum};
pub use config::{DatabaseConfig, DbType, DriftPolicy, MigrationConfig, MigrationOptions};
pub use error::{CoreError, CoreResult};
pub use parser::{parse_script, StepParser};
pub use source::{FileSource, LineStream, MigrationSource, StringSource};
pub use splitter::split_statements;
pub use step::{MigrationStep, StepId};
