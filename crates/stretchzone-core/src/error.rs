//! Core error types for stretchzone-core.
//!
//! The engine boundary only ever hands a caller one of a small set of named
//! conditions. Storage and decoding failures are recovered internally and
//! surface only from explicit `flush`/`shutdown` calls.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for stretchzone-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The catalog had no challenge to select from.
    #[error("No challenges available in the catalog")]
    NoChallengesAvailable,

    /// A malformed XP award request. State is left untouched.
    #[error("Invalid XP amount '{value}': {reason}")]
    InvalidXpAmount { value: String, reason: String },

    /// Persisted bytes at `key` could not be decoded.
    #[error("Corrupt persisted state at '{key}': {message}")]
    CorruptPersistedState { key: String, message: String },

    /// The persistence gateway rejected a write.
    #[error("Failed to persist '{key}': {message}")]
    PersistenceWriteFailure { key: String, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// SQLite errors from the on-disk gateway
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn invalid_xp(value: impl ToString, reason: impl Into<String>) -> Self {
        CoreError::InvalidXpAmount {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
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

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// No usable data directory
    #[error("Cannot determine data directory: {0}")]
    NoDataDir(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
