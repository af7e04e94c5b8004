//! Error types for wm-core

use thiserror::Error;

/// Core error type for Waymark
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: Migration source does not exist
    #[error("[C004] Migration source not found: {path}")]
    SourceNotFound { path: String },

    /// C005: Reading the migration source failed part-way through
    #[error("[C005] Failed to read migration source '{path}': {source}")]
    SourceIo {
        path: String,
        source: std::io::Error,
    },

    /// C006: IO error with file path context
    #[error("[C006] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
