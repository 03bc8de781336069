//! Pipeline Manager
//!
//! Orchestrates the write side of a repository:
//!
//! ```text
//! crawl(repository, hub)
//!   ├─> DocumentFetcher   (fetch upstream JSON)
//!   ├─> extract           (key datasets by id attribute)
//!   ├─> DatasetStore      (append raw + curated version)
//!   └─> ReloadEventBus    (invalidate metamodel caches)
//!
//! apply_mappings(repository, hub)
//!   ├─> DatasetStore      (latest raw records + mapping rules)
//!   ├─> ScriptEngine      (optional dynamic rule)
//!   ├─> static overlay
//!   ├─> DatasetStore      (append standardized version)
//!   └─> ReloadEventBus
//! ```
//!
//! Operations on one repository run one at a time; different repositories
//! proceed in parallel. Everything before the commit is bounded by the
//! configured operation timeout. A failed or timed-out operation commits
//! nothing and publishes no event.

use crate::fetch::{extract_datasets, DocumentFetcher};
use crate::mapping::{apply_static, MappingPlan};
use crate::script::{parse_output, ScriptEngine};
use dashmap::DashMap;
use hubcat_config::{HubConfig, HubcatConfig, PipelineConfig, RepositoryConfig};
use hubcat_core::{
    AttributePath, CommitSummary, DatasetStore, HubVersion, IngestionError,
    MappingError, MappingRule, Operation, RawBatch, Record, ReloadEvent,
    ReloadEventBus, StandardBatch, StandardRecord, StorageResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// What a repository's pipeline is doing right now
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    Crawling { hub: String },
    Mapping { hub: String },
}

/// Configured hubs of a repository split by activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubListing {
    pub active: Vec<String>,
    pub available: Vec<String>,
}

pub struct PipelineManager {
    repositories: Vec<RepositoryConfig>,
    settings: PipelineConfig,
    levels_separator: String,

    store: Arc<dyn DatasetStore>,
    fetcher: Arc<dyn DocumentFetcher>,
    scripts: Arc<dyn ScriptEngine>,
    events: Arc<ReloadEventBus>,

    locks: DashMap<String, Arc<Mutex<()>>>,
    states: DashMap<String, PipelineState>,
}

impl PipelineManager {
    pub fn new(
        config: &HubcatConfig,
        store: Arc<dyn DatasetStore>,
        fetcher: Arc<dyn DocumentFetcher>,
        scripts: Arc<dyn ScriptEngine>,
        events: Arc<ReloadEventBus>,
    ) -> Self {
        Self {
            repositories: config.repositories.clone(),
            settings: config.pipeline.clone(),
            levels_separator: config.metamodel.levels_separator.clone(),
            store,
            fetcher,
            scripts,
            events,
            locks: DashMap::new(),
            states: DashMap::new(),
        }
    }

    pub fn events(&self) -> &Arc<ReloadEventBus> {
        &self.events
    }

    pub fn state(&self, repository: &str) -> PipelineState {
        self.states
            .get(repository)
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    /// Fetch a hub and commit its datasets as the next raw version
    pub async fn crawl(&self, repository: &str, hub: &str) -> Result<CommitSummary, IngestionError> {
        let repo = self
            .repository(repository)
            .ok_or_else(|| IngestionError::UnknownRepository(repository.to_string()))?;
        let hub_config = repo.hub(hub).ok_or_else(|| IngestionError::UnknownHub {
            repository: repository.to_string(),
            hub: hub.to_string(),
        })?;

        let lock = self.lock_for(repository);
        let _serialized = lock.lock().await;
        let _state = self.enter(
            repository,
            PipelineState::Crawling {
                hub: hub.to_string(),
            },
        );
        info!(repository, hub, url = %hub_config.url, "Crawling hub");

        match self.crawl_locked(repo, hub_config).await {
            Ok(summary) => {
                info!(
                    repository,
                    hub,
                    version = summary.version,
                    datasets = summary.datasets,
                    "Crawl committed"
                );
                self.events
                    .publish(ReloadEvent::new(repository, Operation::Crawling));
                Ok(summary)
            }
            Err(e) => {
                error!(repository, hub, error = %e, "Crawl aborted");
                Err(e)
            }
        }
    }

    /// Crawl every active hub of a repository, stopping at the first failure
    pub async fn crawl_active(
        &self,
        repository: &str,
    ) -> Result<Vec<(String, CommitSummary)>, IngestionError> {
        if self.repository(repository).is_none() {
            return Err(IngestionError::UnknownRepository(repository.to_string()));
        }

        let mut committed = Vec::new();
        for hub in self.store.active_hubs(repository).await? {
            let summary = self.crawl(repository, &hub).await?;
            committed.push((hub, summary));
        }
        Ok(committed)
    }

    /// Standardize the latest raw records of a hub with its mapping rules
    pub async fn apply_mappings(
        &self,
        repository: &str,
        hub: &str,
    ) -> Result<CommitSummary, MappingError> {
        self.hub_config(repository, hub)
            .ok_or_else(|| unknown_hub(repository, hub))?;

        let lock = self.lock_for(repository);
        let _serialized = lock.lock().await;
        let _state = self.enter(
            repository,
            PipelineState::Mapping {
                hub: hub.to_string(),
            },
        );
        info!(repository, hub, "Applying mappings");

        match self.map_locked(repository, hub).await {
            Ok(summary) => {
                info!(
                    repository,
                    hub,
                    version = summary.version,
                    datasets = summary.datasets,
                    "Mapping committed"
                );
                self.events
                    .publish(ReloadEvent::new(repository, Operation::Mapping));
                Ok(summary)
            }
            Err(e) => {
                error!(repository, hub, error = %e, "Mapping aborted");
                Err(e)
            }
        }
    }

    /// Replace the mapping rules of a hub
    pub async fn save_mappings(
        &self,
        repository: &str,
        hub: &str,
        rules: Vec<MappingRule>,
    ) -> Result<(), MappingError> {
        self.hub_config(repository, hub)
            .ok_or_else(|| unknown_hub(repository, hub))?;

        let plan = MappingPlan::from_rules(repository, hub, &rules, &self.levels_separator)?;
        if let Some(dynamic) = &plan.dynamic {
            if !self.scripts.supports(&dynamic.language) {
                return Err(MappingError::UnknownLanguage(dynamic.language.clone()));
            }
        }

        let lock = self.lock_for(repository);
        let _serialized = lock.lock().await;
        self.store.save_mappings(repository, hub, rules).await?;
        info!(
            repository,
            hub,
            statics = plan.statics.len(),
            dynamic = plan.dynamic.is_some(),
            "Saved mappings"
        );
        Ok(())
    }

    pub async fn mappings(&self, repository: &str, hub: &str) -> StorageResult<Vec<MappingRule>> {
        self.store.mappings(repository, hub).await
    }

    /// Ledger entries of a hub, newest first
    pub async fn versions(&self, repository: &str, hub: &str) -> StorageResult<Vec<HubVersion>> {
        self.store.versions(repository, hub).await
    }

    pub async fn hubs(&self, repository: &str) -> Result<HubListing, IngestionError> {
        let repo = self
            .repository(repository)
            .ok_or_else(|| IngestionError::UnknownRepository(repository.to_string()))?;

        let active: BTreeSet<String> = self
            .store
            .active_hubs(repository)
            .await?
            .into_iter()
            .collect();
        let available = repo
            .hubs
            .iter()
            .map(|h| h.name.clone())
            .filter(|name| !active.contains(name))
            .collect();

        Ok(HubListing {
            active: active.into_iter().collect(),
            available,
        })
    }

    pub async fn set_hub_active(
        &self,
        repository: &str,
        hub: &str,
        active: bool,
    ) -> Result<(), IngestionError> {
        if self.hub_config(repository, hub).is_none() {
            return Err(IngestionError::UnknownHub {
                repository: repository.to_string(),
                hub: hub.to_string(),
            });
        }
        self.store.set_hub_active(repository, hub, active).await?;
        info!(repository, hub, active, "Hub activation changed");
        Ok(())
    }

    async fn crawl_locked(
        &self,
        repo: &RepositoryConfig,
        hub: &HubConfig,
    ) -> Result<CommitSummary, IngestionError> {
        let id_attribute = repo
            .id_attribute
            .as_deref()
            .map(|path| AttributePath::parse(path, &self.levels_separator));

        let work = async {
            self.fetcher.fetch(&hub.url).await.and_then(|documents| {
                extract_datasets(
                    documents,
                    hub.datasets_pointer.as_deref(),
                    id_attribute.as_ref(),
                )
            })
        };
        let datasets = self
            .within(work, |secs| IngestionError::Timeout { secs })
            .await?;
        debug!(
            repository = %repo.name,
            hub = %hub.name,
            datasets = datasets.len(),
            "Extracted datasets"
        );

        let summary = self
            .store
            .append_raw(RawBatch {
                repository: repo.name.clone(),
                hub: hub.name.clone(),
                username: self.settings.username.clone(),
                datasets,
            })
            .await?;
        Ok(summary)
    }

    async fn map_locked(&self, repository: &str, hub: &str) -> Result<CommitSummary, MappingError> {
        let rules = self.store.mappings(repository, hub).await?;
        let plan = MappingPlan::from_rules(repository, hub, &rules, &self.levels_separator)?;
        if plan.is_empty() {
            return Err(MappingError::InvalidRule(format!(
                "hub {hub} has no mapping rules"
            )));
        }
        if let Some(dynamic) = &plan.dynamic {
            if !self.scripts.supports(&dynamic.language) {
                return Err(MappingError::UnknownLanguage(dynamic.language.clone()));
            }
        }

        let work = async {
            let raw = self.store.latest_raw(repository, hub).await?;
            let mut records = Vec::with_capacity(raw.len());
            for stored in raw {
                let base = match &plan.dynamic {
                    Some(dynamic) => {
                        let input = serde_json::to_string(&stored.content)
                            .map_err(|e| MappingError::Script(e.to_string()))?;
                        self.scripts
                            .run(&dynamic.language, &dynamic.script, &input)
                            .await
                            .and_then(|output| parse_output(&output))
                            .map_err(|e| match e {
                                MappingError::Script(msg) => {
                                    MappingError::Script(format!("dataset {}: {msg}", stored.key))
                                }
                                other => other,
                            })?
                    }
                    None => Record::new(),
                };
                records.push(StandardRecord {
                    dataset_id: stored.dataset_id,
                    raw_version: stored.raw_version,
                    content: apply_static(base, &stored.content, &plan.statics),
                });
            }
            Ok::<_, MappingError>(records)
        };
        let records = self
            .within(work, |secs| MappingError::Timeout { secs })
            .await?;

        let summary = self
            .store
            .append_standard(StandardBatch {
                repository: repository.to_string(),
                hub: hub.to_string(),
                username: self.settings.username.clone(),
                records,
            })
            .await?;
        Ok(summary)
    }

    /// Bound `work` by the operation timeout
    async fn within<T, E, F>(&self, work: F, timed_out: impl FnOnce(u64) -> E) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        match self.settings.operation_timeout() {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .unwrap_or_else(|_| Err(timed_out(limit.as_secs()))),
            None => work.await,
        }
    }

    fn repository(&self, name: &str) -> Option<&RepositoryConfig> {
        self.repositories.iter().find(|r| r.name == name)
    }

    fn hub_config(&self, repository: &str, hub: &str) -> Option<&HubConfig> {
        self.repository(repository)?.hub(hub)
    }

    fn lock_for(&self, repository: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(repository.to_string())
            .or_default()
            .clone()
    }

    fn enter(&self, repository: &str, state: PipelineState) -> StateGuard<'_> {
        self.states.insert(repository.to_string(), state);
        StateGuard {
            states: &self.states,
            repository: repository.to_string(),
        }
    }
}

/// Returns a repository to `Idle` however the operation ends
struct StateGuard<'a> {
    states: &'a DashMap<String, PipelineState>,
    repository: String,
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        self.states.remove(&self.repository);
    }
}

fn unknown_hub(repository: &str, hub: &str) -> MappingError {
    MappingError::UnknownHub {
        repository: repository.to_string(),
        hub: hub.to_string(),
    }
}
