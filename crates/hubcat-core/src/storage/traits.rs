//! Persistent store contracts
//!
//! The core never talks to a storage engine directly. It needs three things
//! from one:
//!
//! - [`MetamodelSource`]: the latest content of every dataset in a repository
//! - [`DatasetStore`]: append-only versioned writes, latest-version reads and
//!   hub bookkeeping
//! - [`SearchExecutor`]: execution of a rewritten predicate with unnest joins
//!
//! ## Thread Safety
//!
//! Implementations must be Send + Sync so they can be shared through `Arc`
//! across tasks.

use super::error::StorageResult;
use super::types::{
    CommitSummary, ContentStage, Dataset, DatasetId, HubVersion, MappingRule, RawBatch,
    StandardBatch, StoredRecord,
};
use crate::error::ExecutionError;
use crate::record::Record;
use async_trait::async_trait;
use hubcat_query::RewrittenQuery;

/// Read side used to rebuild metamodels
#[async_trait]
pub trait MetamodelSource: Send + Sync {
    /// Content of the latest version of every dataset in `repository`.
    ///
    /// For [`ContentStage::Standard`] only datasets that have been mapped
    /// contribute.
    async fn latest_contents(
        &self,
        repository: &str,
        stage: ContentStage,
    ) -> StorageResult<Vec<Record>>;
}

/// Versioned dataset persistence
///
/// Every write is all-or-nothing: either the whole batch and its ledger
/// entries become visible, or nothing does.
#[async_trait]
pub trait DatasetStore: MetamodelSource {
    /// Persist a crawl as the hub's next raw version (previous max + 1, or 1).
    ///
    /// Datasets are matched to existing ids by [`RawBatch`] keys. Ledger
    /// entries for the raw and curated stages are appended.
    async fn append_raw(&self, batch: RawBatch) -> StorageResult<CommitSummary>;

    /// Latest raw content of every dataset in a hub, ordered by dataset id
    async fn latest_raw(&self, repository: &str, hub: &str) -> StorageResult<Vec<StoredRecord>>;

    /// Persist standardized records, each at its dataset's previous standard
    /// version + 1 (or 1), and append a standard-stage ledger entry.
    async fn append_standard(&self, batch: StandardBatch) -> StorageResult<CommitSummary>;

    /// A dataset at `raw_version`, or at its latest raw version when `None`
    async fn fetch(
        &self,
        dataset_id: DatasetId,
        raw_version: Option<u64>,
    ) -> StorageResult<Option<Dataset>>;

    /// Mapping rules of a hub, in the order they were saved
    async fn mappings(&self, repository: &str, hub: &str) -> StorageResult<Vec<MappingRule>>;

    /// Atomically replace the mapping rules of a hub
    async fn save_mappings(
        &self,
        repository: &str,
        hub: &str,
        rules: Vec<MappingRule>,
    ) -> StorageResult<()>;

    /// Ledger entries of a hub, newest first
    async fn versions(&self, repository: &str, hub: &str) -> StorageResult<Vec<HubVersion>>;

    /// Names of the active hubs of a repository, sorted
    async fn active_hubs(&self, repository: &str) -> StorageResult<Vec<String>>;

    async fn set_hub_active(&self, repository: &str, hub: &str, active: bool)
        -> StorageResult<()>;
}

/// Executes rewritten queries against the latest version of every dataset
#[async_trait]
pub trait SearchExecutor: Send + Sync {
    /// Datasets of `repository` matching `query`, ordered by id ascending.
    ///
    /// `limit == 0` means unbounded.
    async fn execute(
        &self,
        repository: &str,
        query: &RewrittenQuery,
        limit: usize,
    ) -> Result<Vec<Dataset>, ExecutionError>;
}
