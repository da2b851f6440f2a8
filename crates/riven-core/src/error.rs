//! Core error types for riven-core.
//!
//! This module defines the error hierarchy using thiserror. Gateway errors
//! are never surfaced to callers of the streak operations; they are logged
//! and swallowed by the session. The remaining types are returned from
//! configuration, storage and validation paths.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for riven-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence gateway errors
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Errors raised while loading or saving streak state remotely or locally.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Transport-level failure (connection refused, TLS, timeout)
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("Server returned {status} for {url}")]
    Status { url: String, status: u16 },

    /// Body could not be decoded into the streak payload
    #[error("Malformed streak payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Local storage failure
    #[error("Local storage failed: {0}")]
    Storage(#[from] DatabaseError),

    /// Gateway refused the call (used by test doubles and offline modes)
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Garden threshold table has the wrong number of stages
    #[error("Garden needs exactly {expected} stage thresholds, got {actual}")]
    StageCount { expected: usize, actual: usize },

    /// Garden threshold table does not start at zero
    #[error("First garden stage must start at day 0, got {0}")]
    FirstStageNotZero(u32),

    /// Garden thresholds are not strictly increasing
    #[error("Garden threshold at index {index} ({value}) must be greater than {previous}")]
    ThresholdNotIncreasing { index: usize, value: u32, previous: u32 },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(err: rusqlite::Error) -> Self {
        GatewayError::Storage(err.into())
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}
