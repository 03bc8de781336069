//! Query component configuration
//!
//! The separator and content roots must match the path encoding of the
//! persistent store that executes rewritten queries.

use serde::{Deserialize, Serialize};

/// Query rewriting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Path operator used inside query text (`curated_content->'a'->'b'`)
    pub separator: String,
    /// Operator reading a leaf as plain text (`->>'cell_type'`)
    pub value_operator: String,
    /// Column names that may start a path reference
    pub content_roots: Vec<String>,
    /// Prefix for generated join aliases (`joinTerm0`, `joinTerm1`, ...)
    pub join_term_prefix: String,
    /// Upper bound on nested array unnesting passes
    pub max_join_depth: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            separator: "->".to_string(),
            value_operator: "->>".to_string(),
            content_roots: vec![
                "curated_content".to_string(),
                "standard_content".to_string(),
            ],
            join_term_prefix: "joinTerm".to_string(),
            max_join_depth: 16,
        }
    }
}

impl QueryConfig {
    /// Content root holding raw (curated) or standardized records
    pub fn content_root(&self, raw: bool) -> Option<&str> {
        let index = if raw { 0 } else { 1 };
        self.content_roots.get(index).map(String::as_str)
    }
}
