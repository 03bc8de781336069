//! Scripting component configuration
//!
//! Dynamic mappings are executed by external interpreters. Each engine entry
//! names the language it serves and the command line used to run a script.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptingConfig {
    pub engines: Vec<ScriptEngineConfig>,
}

/// One interpreter: `program args... <script>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEngineConfig {
    pub language: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ScriptingConfig {
    pub fn engine(&self, language: &str) -> Option<&ScriptEngineConfig> {
        self.engines.iter().find(|e| e.language == language)
    }
}
