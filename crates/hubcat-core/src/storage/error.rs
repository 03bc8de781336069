//! Storage Error Types
//!
//! Errors raised by dataset stores and metamodel sources.

use thiserror::Error;

/// Error type for storage operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Concurrent access error: {0}")]
    ConcurrentAccess(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Create a generic backend error
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        Self::Backend(msg.into())
    }

    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        Self::InvalidOperation(msg.into())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            Self::Deserialization(err.to_string())
        } else {
            Self::Serialization(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_errors_are_deserialization() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(
            StorageError::from(err),
            StorageError::Deserialization(_)
        ));
    }
}
