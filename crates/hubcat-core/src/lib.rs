//! Core of the hubcat metadata catalog.
//!
//! Harvested datasets are schema-less JSON records. This crate derives their
//! schema and serves it to browsing and search:
//!
//! - [`record`] flattens records into attribute paths and values
//! - [`metamodel`] builds and caches the flat and tree views per repository
//! - [`browser`] serves lazy, sorted drill-down over a tree view
//! - [`search`] rewrites array references and hands queries to a store
//! - [`events`] carries the reload notifications that invalidate caches
//! - [`storage`] defines what a persistent store has to provide

pub mod attribute;
pub mod browser;
pub mod error;
pub mod events;
pub mod metamodel;
pub mod record;
pub mod search;
pub mod storage;

pub use attribute::AttributePath;
pub use browser::{BrowserNode, NodeKind, TreeBrowser};
pub use error::{ExecutionError, HubcatError, HubcatResult, IngestionError, MappingError};
pub use events::{Operation, ReloadEvent, ReloadEventBus, ReloadListener};
pub use metamodel::{AttributeTree, FlatMetamodel, MetamodelStore, MetamodelView};
pub use record::{flatten, FlatRecord, Record};
pub use search::SearchService;
pub use storage::{
    CommitSummary, ContentStage, Dataset, DatasetId, DatasetStore, HubVersion, MappingRule,
    MetamodelSource, RawBatch, RawDataset, SearchExecutor, Stage, StandardBatch, StandardRecord,
    StorageError, StorageResult, StoredRecord,
};
