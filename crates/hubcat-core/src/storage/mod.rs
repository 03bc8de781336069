//! Storage contracts and the values passed across them

pub mod error;
pub mod traits;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use traits::{DatasetStore, MetamodelSource, SearchExecutor};
pub use types::{
    CommitSummary, ContentStage, Dataset, DatasetId, HubVersion, MappingRule, RawBatch,
    RawDataset, Stage, StandardBatch, StandardRecord, StoredRecord,
};
