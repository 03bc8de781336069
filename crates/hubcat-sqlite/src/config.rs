//! SQLite connection settings

use hubcat_config::StorageConfig;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub path: PathBuf,
    pub wal_mode: bool,
    pub foreign_keys: bool,
    pub busy_timeout_ms: u32,
    /// Negative values are KiB, positive values pages
    pub cache_size: i64,
}

impl SqliteConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            wal_mode: true,
            foreign_keys: true,
            busy_timeout_ms: 5000,
            cache_size: -16_000,
        }
    }

    pub fn memory() -> Self {
        Self {
            wal_mode: false,
            ..Self::new(":memory:")
        }
    }

    pub fn is_memory(&self) -> bool {
        self.path.to_str() == Some(":memory:")
    }
}

impl From<&StorageConfig> for SqliteConfig {
    fn from(config: &StorageConfig) -> Self {
        Self {
            wal_mode: config.wal_mode,
            foreign_keys: config.foreign_keys,
            busy_timeout_ms: config.busy_timeout_ms,
            ..Self::new(&config.path)
        }
    }
}
