//! # Hubcat Configuration Library
//!
//! Type-safe configuration for the hubcat catalog. Every section has safe
//! defaults so an empty file (or no file at all) yields a working setup.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hubcat_config::HubcatConfig;
//!
//! let config = HubcatConfig::load("hubcat.toml")?;
//! println!("separator: {}", config.metamodel.levels_separator);
//! # Ok::<(), hubcat_config::ConfigError>(())
//! ```

#![warn(clippy::all)]

pub mod components;
mod error;
mod loader;

pub use components::*;
pub use error::ConfigError;
pub use loader::{default_config_path, discover};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubcatConfig {
    pub metamodel: MetamodelConfig,
    pub query: QueryConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
    pub scripting: ScriptingConfig,
    pub repositories: Vec<RepositoryConfig>,
}

impl HubcatConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: "<inline>".into(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Look up a repository by name
    pub fn repository(&self, name: &str) -> Option<&RepositoryConfig> {
        self.repositories.iter().find(|r| r.name == name)
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metamodel.levels_separator.is_empty() {
            return Err(ConfigError::invalid(
                "metamodel.levels_separator",
                "must not be empty",
            ));
        }
        if self.query.separator.is_empty() {
            return Err(ConfigError::invalid("query.separator", "must not be empty"));
        }
        if self.query.content_roots.is_empty() {
            return Err(ConfigError::invalid(
                "query.content_roots",
                "at least one content root is required",
            ));
        }
        if let Some(root) = self
            .query
            .content_roots
            .iter()
            .find(|root| root.is_empty() || root.contains(self.query.separator.as_str()))
        {
            return Err(ConfigError::invalid(
                "query.content_roots",
                format!("root '{}' is empty or contains the query separator", root),
            ));
        }
        if self.query.join_term_prefix.is_empty() {
            return Err(ConfigError::invalid(
                "query.join_term_prefix",
                "must not be empty",
            ));
        }
        if self.query.max_join_depth == 0 {
            return Err(ConfigError::invalid(
                "query.max_join_depth",
                "must be at least 1",
            ));
        }

        let mut seen = HashSet::new();
        for repository in &self.repositories {
            if !seen.insert(repository.name.as_str()) {
                return Err(ConfigError::invalid(
                    "repositories",
                    format!("duplicate repository '{}'", repository.name),
                ));
            }
            let mut hubs = HashSet::new();
            for hub in &repository.hubs {
                if !hubs.insert(hub.name.as_str()) {
                    return Err(ConfigError::invalid(
                        format!("repositories.{}.hubs", repository.name),
                        format!("duplicate hub '{}'", hub.name),
                    ));
                }
            }
        }

        Ok(())
    }
}
