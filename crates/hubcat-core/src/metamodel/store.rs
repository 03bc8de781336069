//! Cached metamodel views
//!
//! Views are built lazily per (repository, raw) key and shared as `Arc`s
//! until the repository is invalidated. Concurrent callers for a key that is
//! being built wait for the same computation.

use super::view::{AttributeTree, FlatMetamodel, MetamodelView};
use crate::attribute::AttributePath;
use crate::events::{ReloadEvent, ReloadListener};
use crate::storage::{ContentStage, MetamodelSource, StorageResult};
use dashmap::DashMap;
use hubcat_config::MetamodelConfig;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

type CacheKey = (String, bool);
type ViewCell = Arc<OnceCell<Arc<MetamodelView>>>;

pub struct MetamodelStore {
    source: Arc<dyn MetamodelSource>,
    config: MetamodelConfig,
    cells: DashMap<CacheKey, ViewCell>,
}

impl MetamodelStore {
    pub fn new(source: Arc<dyn MetamodelSource>, config: MetamodelConfig) -> Self {
        Self {
            source,
            config,
            cells: DashMap::new(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.config.levels_separator
    }

    /// All three views of a repository, building them on first access
    pub async fn view(&self, repository: &str, raw: bool) -> StorageResult<Arc<MetamodelView>> {
        let key = (repository.to_string(), raw);
        let cell = self.cells.entry(key.clone()).or_default().clone();

        let result = cell
            .get_or_try_init(|| self.build(repository, raw))
            .await
            .cloned();

        if let Err(e) = &result {
            warn!(repository, raw, error = %e, "Metamodel rebuild failed");
            // A later call starts from a fresh cell
            self.cells
                .remove_if(&key, |_, current| Arc::ptr_eq(current, &cell));
        }
        result
    }

    async fn build(&self, repository: &str, raw: bool) -> StorageResult<Arc<MetamodelView>> {
        let records = self
            .source
            .latest_contents(repository, ContentStage::from_raw(raw))
            .await?;
        let view = MetamodelView::build(&records, &self.config);

        debug!(
            repository,
            raw,
            records = records.len(),
            attributes = view.flat.len(),
            arrays = view.array_attributes.len(),
            "Rebuilt metamodel"
        );
        Ok(Arc::new(view))
    }

    pub async fn get_flat(&self, repository: &str, raw: bool) -> StorageResult<Arc<FlatMetamodel>> {
        Ok(self.view(repository, raw).await?.flat.clone())
    }

    pub async fn get_tree(&self, repository: &str, raw: bool) -> StorageResult<Arc<AttributeTree>> {
        Ok(self.view(repository, raw).await?.tree.clone())
    }

    pub async fn get_array_attributes(
        &self,
        repository: &str,
        raw: bool,
    ) -> StorageResult<Arc<BTreeSet<AttributePath>>> {
        Ok(self.view(repository, raw).await?.array_attributes.clone())
    }

    /// Drop every cached view of `repository`, raw and standard together
    pub fn invalidate(&self, repository: &str) {
        self.cells.retain(|(cached, _), _| cached != repository);
    }

    /// Flat attribute paths containing `filter`, or their distinct first
    /// segments when `top` is set
    pub async fn attributes(
        &self,
        repository: &str,
        filter: &str,
        raw: bool,
        top: bool,
    ) -> StorageResult<Vec<String>> {
        let flat = self.get_flat(repository, raw).await?;
        let separator = self.separator();

        let names: BTreeSet<String> = flat
            .paths()
            .filter_map(|path| {
                if top {
                    path.first().map(str::to_string)
                } else {
                    Some(path.join(separator))
                }
            })
            .filter(|name| name.contains(filter))
            .collect();
        Ok(names.into_iter().collect())
    }

    /// Child segments of `attribute` in the tree view containing `filter`
    pub async fn sub_attributes(
        &self,
        repository: &str,
        attribute: &str,
        filter: &str,
        raw: bool,
    ) -> StorageResult<Vec<String>> {
        let tree = self.get_tree(repository, raw).await?;
        let path = AttributePath::parse(attribute, self.separator());

        Ok(tree
            .node(&path)
            .map(|node| {
                node.children()
                    .map(|(segment, _)| segment)
                    .filter(|segment| segment.contains(filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Values at exactly `attribute` containing `filter`
    pub async fn values(
        &self,
        repository: &str,
        attribute: &str,
        filter: &str,
        raw: bool,
    ) -> StorageResult<Vec<String>> {
        let flat = self.get_flat(repository, raw).await?;
        let path = AttributePath::parse(attribute, self.separator());

        Ok(flat
            .values(&path)
            .map(|values| {
                values
                    .iter()
                    .filter(|value| value.contains(filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl ReloadListener for MetamodelStore {
    fn on_reload(&self, event: &ReloadEvent) {
        info!(
            repository = %event.repository,
            operation = %event.operation,
            "Invalidating metamodel cache"
        );
        self.invalidate(&event.repository);
    }
}
