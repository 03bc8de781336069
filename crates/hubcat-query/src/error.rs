//! Error types for query rewriting

use thiserror::Error;

/// A query the rewriter refuses to hand to the executor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryRewriteError {
    /// Nested array references did not resolve within the depth bound
    #[error("Join term discovery did not converge within {max_depth} levels")]
    JoinDepthExceeded { max_depth: usize },

    /// A string literal is never closed
    #[error("Unterminated string literal starting at byte {position}")]
    UnbalancedQuote { position: usize },

    /// An array wildcard that is not attached to a content root or join term
    #[error("Array wildcard at byte {position} is not part of a path reference")]
    DanglingWildcard { position: usize },

    #[error("Empty query")]
    EmptyQuery,

    /// The configured roots or separator produce an invalid pattern
    #[error("Invalid path pattern: {0}")]
    InvalidPattern(String),
}

pub type RewriteResult<T> = Result<T, QueryRewriteError>;
