//! Dynamic mapping scripts
//!
//! A script receives one raw record as JSON text and answers with the
//! standardized record as JSON text. How the script runs is up to the
//! [`ScriptEngine`]; [`CommandScriptEngine`] hands it to an external
//! interpreter.

use async_trait::async_trait;
use hubcat_config::{ScriptEngineConfig, ScriptingConfig};
use hubcat_core::{MappingError, Record};
use serde_json::Value;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

#[async_trait]
pub trait ScriptEngine: Send + Sync {
    /// Whether scripts in `language` can be run
    fn supports(&self, language: &str) -> bool;

    /// Run `script` over `input`, returning the script's output text
    async fn run(&self, language: &str, script: &str, input: &str) -> Result<String, MappingError>;
}

/// Runs `program args... <script>` with the record on stdin
pub struct CommandScriptEngine {
    engines: Vec<ScriptEngineConfig>,
}

impl CommandScriptEngine {
    pub fn new(config: &ScriptingConfig) -> Self {
        Self {
            engines: config.engines.clone(),
        }
    }

    fn engine(&self, language: &str) -> Result<&ScriptEngineConfig, MappingError> {
        self.engines
            .iter()
            .find(|e| e.language == language)
            .ok_or_else(|| MappingError::UnknownLanguage(language.to_string()))
    }
}

#[async_trait]
impl ScriptEngine for CommandScriptEngine {
    fn supports(&self, language: &str) -> bool {
        self.engine(language).is_ok()
    }

    async fn run(&self, language: &str, script: &str, input: &str) -> Result<String, MappingError> {
        let engine = self.engine(language)?;
        debug!(%language, program = %engine.program, "Running mapping script");

        let mut child = Command::new(&engine.program)
            .args(&engine.args)
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MappingError::Script(format!("failed to start {}: {}", engine.program, e))
            })?;

        // Feed stdin from its own task so a chatty script cannot block on a full stdout pipe
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.as_bytes().to_vec();
            tokio::spawn(async move {
                let result = stdin.write_all(&input).await;
                drop(stdin);
                result
            })
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| MappingError::Script(format!("{} did not finish: {}", engine.program, e)))?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                // A script may exit without reading all of its input
                Ok(Err(e)) => warn!(program = %engine.program, error = %e, "Script closed stdin early"),
                Err(e) => return Err(MappingError::Script(e.to_string())),
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MappingError::Script(format!(
                "{} exited with {}: {}",
                engine.program,
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| MappingError::Script(format!("output is not UTF-8: {e}")))
    }
}

/// Parse script output into a standardized record
pub fn parse_output(output: &str) -> Result<Record, MappingError> {
    let value: Value = serde_json::from_str(output.trim())
        .map_err(|e| MappingError::Script(format!("output is not valid JSON: {e}")))?;
    match value {
        Value::Object(record) => Ok(record),
        _ => Err(MappingError::Script(
            "output is not a JSON object".to_string(),
        )),
    }
}
