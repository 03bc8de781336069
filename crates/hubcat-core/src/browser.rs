//! Lazy drill-down over a metamodel tree.
//!
//! The root level lists top-level attributes. Expanding an attribute lists
//! its sub-attributes and the values recorded at its exact path, sorted by
//! label. Value nodes never expand.

use crate::attribute::AttributePath;
use crate::metamodel::{MetamodelStore, MetamodelView};
use crate::storage::StorageResult;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Attribute,
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowserNode {
    /// Segment name for attributes, the value itself for values
    pub label: String,
    /// Attribute path; for value nodes the path the value was recorded at
    pub path: AttributePath,
    pub kind: NodeKind,
    /// Depth below the root, starting at 0
    pub level: usize,
    /// At least one value recorded at this exact path
    pub has_values: bool,
    /// Path holds lists of objects
    pub is_array: bool,
    pub child_count: usize,
}

impl BrowserNode {
    pub fn is_expandable(&self) -> bool {
        self.kind == NodeKind::Attribute && self.child_count > 0
    }
}

pub struct TreeBrowser {
    store: Arc<MetamodelStore>,
}

impl TreeBrowser {
    pub fn new(store: Arc<MetamodelStore>) -> Self {
        Self { store }
    }

    /// Children of the attribute at `path`, joined with the levels separator;
    /// the empty path lists the root level
    pub async fn expand(
        &self,
        repository: &str,
        raw: bool,
        path: &str,
    ) -> StorageResult<Vec<BrowserNode>> {
        let view = self.store.view(repository, raw).await?;
        let path = AttributePath::parse(path, self.store.separator());
        Ok(children(&view, &path))
    }

    /// Children whose label contains `filter`
    pub async fn expand_filtered(
        &self,
        repository: &str,
        raw: bool,
        path: &str,
        filter: &str,
    ) -> StorageResult<Vec<BrowserNode>> {
        let mut nodes = self.expand(repository, raw, path).await?;
        nodes.retain(|node| node.label.contains(filter));
        Ok(nodes)
    }
}

/// Children of `parent`; the empty path yields the root level
pub fn children(view: &MetamodelView, parent: &AttributePath) -> Vec<BrowserNode> {
    let Some(node) = view.tree.node(parent) else {
        return Vec::new();
    };
    let level = parent.len();

    let attributes = node.children().map(|(segment, child)| {
        let path = parent.child(segment.clone());
        BrowserNode {
            label: segment.clone(),
            kind: NodeKind::Attribute,
            level,
            has_values: child.has_values(),
            is_array: view.is_array(&path),
            child_count: child.children().count() + child.values().map_or(0, |v| v.len()),
            path,
        }
    });

    // The root has no values of its own
    let values = node.values().into_iter().flatten().map(|value| BrowserNode {
        label: value.clone(),
        path: parent.clone(),
        kind: NodeKind::Value,
        level,
        has_values: false,
        is_array: false,
        child_count: 0,
    });

    let mut nodes: Vec<BrowserNode> = attributes.chain(values).collect();
    nodes.sort_by(|a, b| a.label.cmp(&b.label).then(a.kind.cmp(&b.kind)));
    nodes
}
