//! Pipeline for hubcat repositories
//!
//! Fills the store that the metamodel and search read from:
//!
//! - [`fetch`] pulls upstream JSON and keys it into datasets
//! - [`mapping`] turns raw records into standardized ones
//! - [`script`] runs dynamic mapping scripts in an external interpreter
//! - [`manager`] serializes crawls and mapping runs per repository, commits
//!   them as new versions and publishes reload events
//!
//! ## Usage
//!
//! ```rust,ignore
//! let manager = PipelineManager::new(
//!     &config,
//!     Arc::new(store),
//!     Arc::new(HttpJsonFetcher::new(config.pipeline.operation_timeout())?),
//!     Arc::new(CommandScriptEngine::new(&config.scripting)),
//!     events,
//! );
//! manager.crawl("cellxgene", "2024-07").await?;
//! manager.apply_mappings("cellxgene", "2024-07").await?;
//! ```

pub mod fetch;
pub mod manager;
pub mod mapping;
pub mod script;

pub use fetch::{extract_datasets, parse_documents, DocumentFetcher, HttpJsonFetcher};
pub use manager::{HubListing, PipelineManager, PipelineState};
pub use mapping::{apply_static, DynamicMapping, MappingPlan, StaticMapping};
pub use script::{parse_output, CommandScriptEngine, ScriptEngine};
