//! Dataset records and the path flattener
//!
//! A record is a JSON object whose values are nested maps, lists and
//! scalars. [`flatten`] walks a record and reports every scalar together
//! with the attribute path leading to it, plus the paths that hold lists of
//! objects.
//!
//! ```text
//! {"a": {"b": ["x", "y"]}, "c": [{"d": 1}]}
//!   a>b = x, a>b = y, c>d = 1        arrays: {c}
//! ```

use crate::attribute::AttributePath;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A dataset's content
pub type Record = Map<String, Value>;

/// Output of [`flatten`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatRecord {
    /// Every (path, scalar) pair in document order; a path may repeat
    pub pairs: Vec<(AttributePath, String)>,
    /// Every terminal path, including those ending in `null` or an empty container
    pub paths: BTreeSet<AttributePath>,
    /// Paths whose value is a list containing at least one object
    pub array_attributes: BTreeSet<AttributePath>,
}

/// Flatten a record into attribute/value pairs.
///
/// Map keys extend the path. List elements stay at the list's path, so a
/// list of scalars yields several values for one attribute. `null` carries
/// no value.
pub fn flatten(record: &Record) -> FlatRecord {
    let mut flat = FlatRecord::default();
    let mut path = Vec::new();

    for (key, value) in record {
        path.push(key.clone());
        walk(value, &mut path, &mut flat);
        path.pop();
    }

    flat
}

fn walk(value: &Value, path: &mut Vec<String>, flat: &mut FlatRecord) {
    match value {
        Value::Object(map) => {
            if map.is_empty() {
                flat.paths.insert(AttributePath::from(path.clone()));
            }
            for (key, child) in map {
                path.push(key.clone());
                walk(child, path, flat);
                path.pop();
            }
        }
        Value::Array(items) => {
            let current = AttributePath::from(path.clone());
            if items.is_empty() {
                flat.paths.insert(current);
            } else if items.iter().any(Value::is_object) {
                flat.array_attributes.insert(current);
            }
            for item in items {
                walk(item, path, flat);
            }
        }
        Value::Null => {
            flat.paths.insert(AttributePath::from(path.clone()));
        }
        scalar => {
            let current = AttributePath::from(path.clone());
            flat.paths.insert(current.clone());
            if let Some(text) = scalar_text(scalar) {
                flat.pairs.push((current, text));
            }
        }
    }
}

/// Text form of a scalar, `None` for containers and `null`
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn path(text: &str) -> AttributePath {
        AttributePath::parse(text, ">")
    }

    #[test]
    fn test_list_of_scalars_repeats_path() {
        let flat = flatten(&record(json!({"a": {"b": ["x", "y"]}})));

        assert_eq!(
            flat.pairs,
            vec![(path("a>b"), "x".to_string()), (path("a>b"), "y".to_string())]
        );
        assert!(flat.array_attributes.is_empty());
    }

    #[test]
    fn test_list_of_objects_marks_array() {
        let flat = flatten(&record(json!({
            "samples": [{"donor": "D1"}, {"donor": "D2", "age": 40}]
        })));

        assert!(flat.array_attributes.contains(&path("samples")));
        assert_eq!(
            flat.pairs,
            vec![
                (path("samples>donor"), "D1".to_string()),
                (path("samples>age"), "40".to_string()),
                (path("samples>donor"), "D2".to_string()),
            ]
        );
    }

    #[test]
    fn test_nested_list_of_objects_marks_array() {
        let flat = flatten(&record(json!({"m": [[{"k": true}]]})));

        assert!(flat.array_attributes.contains(&path("m")));
        assert_eq!(flat.pairs, vec![(path("m>k"), "true".to_string())]);
    }

    #[test]
    fn test_null_and_empty_containers_keep_path() {
        let flat = flatten(&record(json!({"a": null, "b": [], "c": {}})));

        assert!(flat.pairs.is_empty());
        assert!(flat.paths.contains(&path("a")));
        assert!(flat.paths.contains(&path("b")));
        assert!(flat.paths.contains(&path("c")));
    }
}
