//! Values exchanged with the persistent store

use crate::events::Operation;
use crate::record::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned dataset identifier, stable across versions
pub type DatasetId = i64;

/// Pipeline stage with its own version counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Raw,
    Curated,
    Standard,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Raw => "RAW",
            Stage::Curated => "CURATED",
            Stage::Standard => "STANDARD",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "RAW" => Some(Stage::Raw),
            "CURATED" => Some(Stage::Curated),
            "STANDARD" => Some(Stage::Standard),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which content a metamodel or search reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentStage {
    /// Curated content (identical to raw)
    Curated,
    Standard,
}

impl ContentStage {
    pub fn from_raw(raw: bool) -> Self {
        if raw {
            ContentStage::Curated
        } else {
            ContentStage::Standard
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, ContentStage::Curated)
    }
}

/// One ledger entry of a hub's stage history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubVersion {
    pub repository: String,
    pub hub: String,
    pub stage: Stage,
    pub version: u64,
    pub operation: Operation,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub current: bool,
    pub previous: bool,
}

/// A dataset as fetched from upstream.
///
/// `key` identifies the dataset within its hub across crawls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDataset {
    pub key: String,
    pub content: Record,
}

/// Everything one crawl persists
#[derive(Debug, Clone, PartialEq)]
pub struct RawBatch {
    pub repository: String,
    pub hub: String,
    pub username: String,
    pub datasets: Vec<RawDataset>,
}

/// Latest raw content of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub dataset_id: DatasetId,
    pub key: String,
    pub raw_version: u64,
    pub content: Record,
}

/// Standardized content derived from one raw version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardRecord {
    pub dataset_id: DatasetId,
    pub raw_version: u64,
    pub content: Record,
}

/// Everything one mapping run persists
#[derive(Debug, Clone, PartialEq)]
pub struct StandardBatch {
    pub repository: String,
    pub hub: String,
    pub username: String,
    pub records: Vec<StandardRecord>,
}

/// A dataset with the content of every stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,
    pub repository: String,
    pub hub: String,
    pub raw_version: u64,
    pub curated_version: u64,
    pub curated_content: Record,
    pub standard_version: Option<u64>,
    pub standard_content: Option<Record>,
}

/// Result of committing a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    /// Hub-level version of the committed stage
    pub version: u64,
    pub datasets: usize,
}

/// How raw records become standardized records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingRule {
    /// Copy the value(s) at `source` to `destination`, both joined with the
    /// levels separator
    Static { source: String, destination: String },
    /// Transform the whole record with a script
    Dynamic { language: String, script: String },
}

impl MappingRule {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, MappingRule::Dynamic { .. })
    }
}
