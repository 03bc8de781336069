//! Storage component configuration
//!
//! Configuration for the SQLite database holding versioned records.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file, or `:memory:`
    pub path: PathBuf,
    pub wal_mode: bool,
    pub foreign_keys: bool,
    pub busy_timeout_ms: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./hubcat.db"),
            wal_mode: true,
            foreign_keys: true,
            busy_timeout_ms: 5000,
        }
    }
}
