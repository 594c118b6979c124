//! Error types for reference-data operations

use thiserror::Error;

/// Backing-store errors, propagated unchanged to callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Backing store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Fetch from {table} failed: {reason}")]
    FetchFailed { table: String, reason: String },

    #[error("Insert into {table} rejected: {reason}")]
    InsertRejected { table: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Payload encoding errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Failed to serialize {table} payload: {reason}")]
    Serialize { table: String, reason: String },

    #[error("Failed to deserialize {table} payload: {reason}")]
    Deserialize { table: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for reference-data operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefDataError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for reference-data operations.
pub type RefDataResult<T> = Result<T, RefDataError>;

// =============================================================================
// TESTS
// =============================================================================
