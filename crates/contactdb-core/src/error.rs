//! Error types for contactdb-core

use thiserror::Error;

/// Result type alias using contactdb-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in contactdb-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A record schema the merge engine cannot handle
    #[error("Schema error: {0}")]
    Schema(String),

    /// A record failed validation before being persisted
    #[error("Validation failed: {0}")]
    Validation(String),

    /// External registry lookup failed
    #[error("Registry error: {0}")]
    Registry(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
