//! Error types for SQLite storage

use hubcat_core::{ExecutionError, StorageError};
use thiserror::Error;

/// SQLite storage error type
#[derive(Error, Debug)]
pub enum SqliteError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Schema/migration error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A stored column holds something the schema does not allow
    #[error("Invalid stored value: {0}")]
    InvalidValue(String),

    /// Statement would modify the database
    #[error("Statement is not read-only")]
    NotReadOnly,

    /// Search predicate closes a parenthesis it did not open
    #[error("Search predicate leaves its group at byte {position}")]
    UnbalancedPredicate { position: usize },

    /// Stored JSON could not be read or written
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying rusqlite error
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Result type for SQLite operations
pub type SqliteResult<T> = Result<T, SqliteError>;

impl SqliteError {
    fn is_busy(&self) -> bool {
        matches!(
            self,
            SqliteError::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
                if matches!(e.code, rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
        )
    }
}

impl From<SqliteError> for StorageError {
    fn from(err: SqliteError) -> Self {
        if err.is_busy() {
            return Self::ConcurrentAccess(err.to_string());
        }
        match err {
            SqliteError::Connection(msg) => Self::Backend(msg),
            SqliteError::Schema(msg) => Self::Backend(msg),
            SqliteError::InvalidOperation(msg) => Self::InvalidOperation(msg),
            SqliteError::InvalidValue(msg) => Self::Deserialization(msg),
            SqliteError::NotReadOnly => Self::InvalidOperation("statement is not read-only".to_string()),
            SqliteError::UnbalancedPredicate { position } => Self::InvalidOperation(format!(
                "search predicate leaves its group at byte {position}"
            )),
            SqliteError::Serialization(e) => e.into(),
            SqliteError::Rusqlite(e) => Self::Backend(e.to_string()),
        }
    }
}

impl From<SqliteError> for ExecutionError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Rusqlite(rusqlite::Error::MultipleStatement) => Self::MultipleStatements,
            SqliteError::NotReadOnly => Self::NotReadOnly,
            SqliteError::UnbalancedPredicate { position } => Self::UnbalancedPredicate { position },
            SqliteError::Serialization(e) => Self::Decode(e.to_string()),
            other => Self::Backend(other.to_string()),
        }
    }
}
