//! Metamodel views derived from a repository's latest records.
//!
//! All three views come out of a single pass over the records:
//!
//! - [`FlatMetamodel`]: attribute path to the set of distinct values
//! - [`AttributeTree`]: the same data nested by path segment
//! - array attributes: paths holding lists of objects

use crate::attribute::AttributePath;
use crate::record::{flatten, Record};
use hubcat_config::MetamodelConfig;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Attribute path to its distinct, non-excluded values.
///
/// A path seen only with excluded values, `null` or empty containers is
/// present with an empty value set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatMetamodel {
    entries: BTreeMap<AttributePath, BTreeSet<String>>,
}

impl FlatMetamodel {
    pub fn insert_path(&mut self, path: AttributePath) {
        self.entries.entry(path).or_default();
    }

    pub fn insert(&mut self, path: AttributePath, value: String) {
        self.entries.entry(path).or_default().insert(value);
    }

    pub fn values(&self, path: &AttributePath) -> Option<&BTreeSet<String>> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &AttributePath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttributePath, &BTreeSet<String>)> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &AttributePath> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `{"a>b": ["x", "y"]}`
    pub fn to_json(&self, separator: &str) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(path, values)| {
                let values = values.iter().cloned().map(Value::String).collect();
                (path.join(separator), Value::Array(values))
            })
            .collect();
        Value::Object(map)
    }
}

impl FromIterator<(AttributePath, BTreeSet<String>)> for FlatMetamodel {
    fn from_iter<T: IntoIterator<Item = (AttributePath, BTreeSet<String>)>>(iter: T) -> Self {
        let mut flat = Self::default();
        for (path, values) in iter {
            flat.entries.entry(path).or_default().extend(values);
        }
        flat
    }
}

/// Nested form of a [`FlatMetamodel`].
///
/// A node may carry both values and children when records disagree about
/// an attribute's shape (`{"a": "x"}` next to `{"a": {"b": "y"}}`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeTree {
    children: BTreeMap<String, AttributeTree>,
    values: Option<BTreeSet<String>>,
}

impl AttributeTree {
    /// Build by splitting every flat path into segments. Insertion order does
    /// not affect the result.
    pub fn from_flat(flat: &FlatMetamodel) -> Self {
        let mut root = Self::default();
        for (path, values) in flat.iter() {
            root.insert(path.segments(), values);
        }
        root
    }

    fn insert(&mut self, segments: &[String], values: &BTreeSet<String>) {
        match segments.split_first() {
            None => self
                .values
                .get_or_insert_with(BTreeSet::new)
                .extend(values.iter().cloned()),
            Some((head, rest)) => self
                .children
                .entry(head.clone())
                .or_default()
                .insert(rest, values),
        }
    }

    pub fn child(&self, segment: &str) -> Option<&AttributeTree> {
        self.children.get(segment)
    }

    pub fn children(&self) -> impl Iterator<Item = (&String, &AttributeTree)> {
        self.children.iter()
    }

    /// Node at `path`; the empty path is the root
    pub fn node(&self, path: &AttributePath) -> Option<&AttributeTree> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Values recorded for this node's own path
    pub fn values(&self) -> Option<&BTreeSet<String>> {
        self.values.as_ref()
    }

    pub fn has_values(&self) -> bool {
        self.values.as_ref().is_some_and(|values| !values.is_empty())
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Leaves become value arrays and inner nodes objects. A node with both
    /// keeps its values under the empty key.
    pub fn to_json(&self) -> Value {
        let values = || {
            Value::Array(
                self.values
                    .iter()
                    .flatten()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            )
        };

        if self.children.is_empty() {
            return values();
        }

        let mut map: Map<String, Value> = self
            .children
            .iter()
            .map(|(segment, child)| (segment.clone(), child.to_json()))
            .collect();
        if self.has_values() {
            map.insert(String::new(), values());
        }
        Value::Object(map)
    }
}

/// The three metamodel views of one repository and content stage
#[derive(Debug, Clone, Default)]
pub struct MetamodelView {
    pub flat: Arc<FlatMetamodel>,
    pub tree: Arc<AttributeTree>,
    pub array_attributes: Arc<BTreeSet<AttributePath>>,
}

impl MetamodelView {
    pub fn build(records: &[Record], config: &MetamodelConfig) -> Self {
        let mut flat = FlatMetamodel::default();
        let mut array_attributes = BTreeSet::new();

        for record in records {
            let flattened = flatten(record);
            for path in flattened.paths {
                flat.insert_path(path);
            }
            for (path, value) in flattened.pairs {
                if config.is_excluded_value(&value) {
                    flat.insert_path(path);
                } else {
                    flat.insert(path, value);
                }
            }
            array_attributes.extend(flattened.array_attributes);
        }

        let tree = AttributeTree::from_flat(&flat);
        Self {
            flat: Arc::new(flat),
            tree: Arc::new(tree),
            array_attributes: Arc::new(array_attributes),
        }
    }

    pub fn is_array(&self, path: &AttributePath) -> bool {
        self.array_attributes.contains(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()
    }

    fn path(text: &str) -> AttributePath {
        AttributePath::parse(text, ">")
    }

    #[test]
    fn test_flat_view_merges_records() {
        let view = MetamodelView::build(
            &records(vec![json!({"a": {"b": "x"}}), json!({"a": {"b": "y"}, "c": 3})]),
            &MetamodelConfig::default(),
        );

        assert_eq!(
            view.flat.to_json(">"),
            json!({"a>b": ["x", "y"], "c": ["3"]})
        );
    }

    #[test]
    fn test_urls_are_excluded_from_values_but_keep_the_path() {
        let view = MetamodelView::build(
            &records(vec![json!({"link": "https://example.org/1", "name": "n"})]),
            &MetamodelConfig::default(),
        );

        assert_eq!(view.flat.values(&path("link")).map(|v| v.len()), Some(0));
        assert!(!view.tree.node(&path("link")).unwrap().has_values());
        assert!(view.tree.node(&path("name")).unwrap().has_values());
    }

    #[test]
    fn test_tree_nests_segments() {
        let view = MetamodelView::build(
            &records(vec![json!({"a": {"b": ["x", "y"]}})]),
            &MetamodelConfig::default(),
        );

        assert_eq!(view.tree.to_json(), json!({"a": {"b": ["x", "y"]}}));
    }

    #[test]
    fn test_mixed_node_keeps_values_and_children() {
        let view = MetamodelView::build(
            &records(vec![json!({"a": "x"}), json!({"a": {"b": "y"}})]),
            &MetamodelConfig::default(),
        );

        let node = view.tree.node(&path("a")).unwrap();
        assert!(node.has_values());
        assert!(node.child("b").is_some());
        assert_eq!(view.tree.to_json(), json!({"a": {"": ["x"], "b": ["y"]}}));
    }

    #[test]
    fn test_tree_is_independent_of_insertion_order() {
        let entries = vec![
            (path("a>b"), BTreeSet::from(["1".to_string()])),
            (path("a"), BTreeSet::from(["2".to_string()])),
            (path("c>d>e"), BTreeSet::new()),
        ];
        let mut reversed = entries.clone();
        reversed.reverse();

        let forward = AttributeTree::from_flat(&entries.into_iter().collect());
        let backward = AttributeTree::from_flat(&reversed.into_iter().collect());
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_array_attributes_collected() {
        let view = MetamodelView::build(
            &records(vec![json!({"samples": [{"files": [{"name": "x.bam"}]}]})]),
            &MetamodelConfig::default(),
        );

        assert!(view.is_array(&path("samples")));
        assert!(view.is_array(&path("samples>files")));
        assert!(!view.is_array(&path("samples>files>name")));
    }
}
