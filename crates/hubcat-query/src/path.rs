//! Rendering metamodel attribute paths as query references.
//!
//! The metamodel joins path segments with its own levels separator; queries
//! address the same positions through the store's path operator. This module
//! bridges the two so a browsed attribute can be dropped into a query:
//!
//! ```text
//! samples>files>name   (samples is an array of objects)
//!   => curated_content->'samples'->*->'files'->>'name'
//! ```

use hubcat_config::QueryConfig;

/// Builds query references from attribute path segments
#[derive(Debug, Clone)]
pub struct PathExpression {
    separator: String,
    value_operator: String,
}

impl PathExpression {
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            separator: config.separator.clone(),
            value_operator: config.value_operator.clone(),
        }
    }

    /// Render `segments` under `root`.
    ///
    /// `is_array` is asked about every proper prefix of `segments`; prefixes it
    /// accepts are followed by the array wildcard. The last segment is read
    /// with the value operator so it compares against plain literals.
    pub fn render<S, F>(&self, root: &str, segments: &[S], is_array: F) -> String
    where
        S: AsRef<str>,
        F: Fn(&[S]) -> bool,
    {
        let mut expression = root.to_string();
        let last = segments.len().saturating_sub(1);

        for (index, segment) in segments.iter().enumerate() {
            if index == last {
                expression.push_str(&self.value_operator);
            } else {
                expression.push_str(&self.separator);
            }
            expression.push_str(&quote(segment.as_ref()));

            if index < last && is_array(&segments[..=index]) {
                expression.push_str(&self.separator);
                expression.push('*');
            }
        }

        expression
    }
}

/// Single-quote a path segment, doubling embedded quotes
fn quote(segment: &str) -> String {
    format!("'{}'", segment.replace('\'', "''"))
}
