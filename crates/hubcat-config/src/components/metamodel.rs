//! Metamodel component configuration
//!
//! Controls how record attribute paths are joined and which values are kept
//! out of the metamodel value sets.

use serde::{Deserialize, Serialize};

/// Default separator between attribute path segments.
pub const DEFAULT_LEVELS_SEPARATOR: &str = ">";

/// Metamodel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetamodelConfig {
    /// Separator placed between path segments (`a>b>c`)
    pub levels_separator: String,
    /// Values starting with any of these prefixes are stored as content but
    /// never enumerated in the metamodel.
    pub excluded_value_prefixes: Vec<String>,
}

impl Default for MetamodelConfig {
    fn default() -> Self {
        Self {
            levels_separator: DEFAULT_LEVELS_SEPARATOR.to_string(),
            excluded_value_prefixes: vec!["http://".to_string(), "https://".to_string()],
        }
    }
}

impl MetamodelConfig {
    /// Whether a scalar value is kept out of metamodel enumeration
    pub fn is_excluded_value(&self, value: &str) -> bool {
        self.excluded_value_prefixes
            .iter()
            .any(|prefix| value.starts_with(prefix.as_str()))
    }
}
