//! Store error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Referenced user does not exist.
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// Username already taken.
    #[error("User already exists: {0}")]
    DuplicateUser(String),

    /// A stored value failed to decode.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// Storage is unavailable.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
