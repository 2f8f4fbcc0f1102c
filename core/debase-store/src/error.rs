//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from DuckDB.
    #[error("database error: {0}")]
    Database(duckdb::Error),

    /// A concurrent transaction modified the same record first.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record not found.
    #[error("record not found: {0}")]
    NotFound(String),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A thread panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

impl StorageError {
    /// Returns true if the operation lost a race and may be retried.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// DuckDB prefixes every failure message with its exception type; lost
/// optimistic-concurrency races are raised as `TransactionContext` errors.
const TRANSACTION_EXCEPTION: &str = "TransactionContext Error:";

fn is_transaction_conflict(e: &duckdb::Error) -> bool {
    match e {
        duckdb::Error::DuckDBFailure(_, Some(msg)) => {
            msg.starts_with(TRANSACTION_EXCEPTION) && msg.to_ascii_lowercase().contains("conflict")
        }
        _ => false,
    }
}

impl From<duckdb::Error> for StorageError {
    fn from(e: duckdb::Error) -> Self {
        if is_transaction_conflict(&e) {
            Self::Conflict(e.to_string())
        } else {
            Self::Database(e)
        }
    }
}
