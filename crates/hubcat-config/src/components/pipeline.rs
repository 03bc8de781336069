//! Pipeline component configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Crawl and mapping behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Coarse timeout for one crawl or mapping operation; 0 disables it
    pub operation_timeout_secs: u64,
    /// Language of the dynamic mapping scripts
    pub scripting_language: String,
    /// Recorded in the version ledger for every pipeline operation
    pub username: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: 600,
            scripting_language: "python".to_string(),
            username: "hubcat".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn operation_timeout(&self) -> Option<Duration> {
        match self.operation_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
