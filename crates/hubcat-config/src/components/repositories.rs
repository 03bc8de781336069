//! Source repository configuration
//!
//! A repository is one external metadata provider. It exposes one or more
//! hubs, each fetched from its own JSON endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    /// Attribute path whose value identifies a dataset across crawls.
    /// Without it datasets are keyed by their position in the fetched payload.
    #[serde(default)]
    pub id_attribute: Option<String>,
    #[serde(default)]
    pub hubs: Vec<HubConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    pub name: String,
    pub url: String,
    /// JSON pointer to the dataset collection inside the fetched document.
    /// An object found there is read as `id -> dataset`, an array as a list.
    #[serde(default)]
    pub datasets_pointer: Option<String>,
}

impl RepositoryConfig {
    pub fn hub(&self, name: &str) -> Option<&HubConfig> {
        self.hubs.iter().find(|h| h.name == name)
    }
}
