//! Configuration file loading and discovery
//!
//! Resolution order:
//! 1. Explicit path (`--config`)
//! 2. `./hubcat.toml`
//! 3. `~/.config/hubcat/config.toml`
//! 4. Built-in defaults

use crate::{ConfigError, HubcatConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const LOCAL_CONFIG_FILE: &str = "hubcat.toml";

impl HubcatConfig {
    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: HubcatConfig =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;

        info!(
            path = %path.display(),
            repositories = config.repositories.len(),
            "Loaded configuration"
        );
        Ok(config)
    }
}

/// User-level config location (`~/.config/hubcat/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("hubcat").join("config.toml"))
}

/// Load configuration following the resolution order above
pub fn discover(explicit: Option<&Path>) -> Result<HubcatConfig, ConfigError> {
    if let Some(path) = explicit {
        return HubcatConfig::load(path);
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return HubcatConfig::load(local);
    }

    if let Some(user) = default_config_path().filter(|p| p.exists()) {
        return HubcatConfig::load(user);
    }

    debug!("No configuration file found, using defaults");
    Ok(HubcatConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[metamodel]\nlevels_separator = \"/\"\n").unwrap();

        let config = HubcatConfig::load(&path).unwrap();
        assert_eq!(config.metamodel.levels_separator, "/");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = HubcatConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn load_malformed_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[metamodel\n").unwrap();

        let result = HubcatConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn discover_prefers_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("explicit.toml");
        fs::write(&path, "[pipeline]\nusername = \"curator\"\n").unwrap();

        let config = discover(Some(&path)).unwrap();
        assert_eq!(config.pipeline.username, "curator");
    }
}
