//! Error taxonomy
//!
//! Every failure is scoped to one operation or request:
//!
//! - [`IngestionError`] aborts a crawl
//! - [`MappingError`] aborts a mapping run
//! - [`QueryRewriteError`] rejects a query
//! - [`ExecutionError`] turns a search into an empty result

use crate::storage::StorageError;
use hubcat_query::QueryRewriteError;
use thiserror::Error;

/// Upstream fetch or parse failure during a crawl
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Failed to parse upstream data: {0}")]
    Parse(String),

    #[error("Unknown repository: {0}")]
    UnknownRepository(String),

    #[error("Unknown hub {hub} in repository {repository}")]
    UnknownHub { repository: String, hub: String },

    #[error("Crawl timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Dynamic script failure or malformed mapping rule
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("Mapping script failed: {0}")]
    Script(String),

    #[error("No script engine for language {0}")]
    UnknownLanguage(String),

    #[error("Invalid mapping rule: {0}")]
    InvalidRule(String),

    #[error("Hub {hub} in repository {repository} has more than one dynamic mapping")]
    MultipleDynamic { repository: String, hub: String },

    #[error("Unknown hub {hub} in repository {repository}")]
    UnknownHub { repository: String, hub: String },

    #[error("Mapping timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Backing-store failure during search
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Search backend error: {0}")]
    Backend(String),

    #[error("Refusing to run a statement that is not read-only")]
    NotReadOnly,

    #[error("Refusing to run more than one statement")]
    MultipleStatements,

    /// The predicate would reach rows outside the searched repository
    #[error("Refusing a predicate that closes an unopened parenthesis at byte {position}")]
    UnbalancedPredicate { position: usize },

    #[error("Failed to decode search result: {0}")]
    Decode(String),
}

impl ExecutionError {
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        Self::Backend(msg.into())
    }
}

/// Any hubcat failure
#[derive(Error, Debug)]
pub enum HubcatError {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    QueryRewrite(#[from] QueryRewriteError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type HubcatResult<T> = Result<T, HubcatError>;
