//! wm-db - Database abstraction layer for Waymark
//!
//! This crate provides the `Database` trait family the migration engine
//! drives, with a DuckDB implementation and (behind the `postgres`
//! feature) a PostgreSQL implementation.

pub mod duckdb;
pub mod error;
pub mod lock;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod traits;

pub use crate::duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use lock::LockRegistry;
#[cfg(feature = "postgres")]
pub use crate::postgres::PostgresBackend;
pub use traits::{Database, DatabaseCore, DatabaseSchema, DatabaseSession, DatabaseTransaction};
