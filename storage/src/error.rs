//! Storage error types.
//!
//! Used by store implementations and callers of storage APIs. A missing
//! record or an unknown instance is not an error; those come back as
//! `Ok(None)` or an empty set.

use thiserror::Error;

/// Errors that can occur when using storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}
