//! Attribute paths
//!
//! An [`AttributePath`] names one position in the schema of a repository,
//! e.g. `sample>donor>age`. Paths are kept as segments; the separator only
//! matters when a path is displayed or parsed.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttributePath(Vec<String>);

impl AttributePath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Split `text` on `separator`. An empty string is the empty path.
    pub fn parse(text: &str, separator: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        Self::new(text.split(separator))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Path extended by one segment
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn starts_with(&self, prefix: &AttributePath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn join(&self, separator: &str) -> String {
        self.0.join(separator)
    }

    /// Borrow as a displayable value using `separator`
    pub fn display<'a>(&'a self, separator: &'a str) -> JoinedPath<'a> {
        JoinedPath {
            path: self,
            separator,
        }
    }
}

impl From<Vec<String>> for AttributePath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

pub struct JoinedPath<'a> {
    path: &'a AttributePath,
    separator: &'a str,
}

impl fmt::Display for JoinedPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path.join(self.separator))
    }
}
