//! Configuration components
//!
//! Each component maps to one TOML section of the hubcat configuration file.

pub mod metamodel;
pub mod pipeline;
pub mod query;
pub mod repositories;
pub mod scripting;
pub mod storage;

pub use metamodel::MetamodelConfig;
pub use pipeline::PipelineConfig;
pub use query::QueryConfig;
pub use repositories::{HubConfig, RepositoryConfig};
pub use scripting::{ScriptEngineConfig, ScriptingConfig};
pub use storage::StorageConfig;
