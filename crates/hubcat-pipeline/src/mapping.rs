//! Mapping application
//!
//! A hub's rules turn each raw record into a standardized record: the dynamic
//! rule (if any) produces the starting record, then every static rule copies
//! the value(s) at its source path onto its destination path.

use hubcat_core::{AttributePath, MappingError, MappingRule, Record};
use serde_json::{Map, Value};

/// Copy the value(s) at one path to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMapping {
    pub source: AttributePath,
    pub destination: AttributePath,
}

/// Script that rewrites the whole record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicMapping {
    pub language: String,
    pub script: String,
}

/// Validated mapping rules of one hub
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingPlan {
    pub dynamic: Option<DynamicMapping>,
    pub statics: Vec<StaticMapping>,
}

impl MappingPlan {
    /// Split stored rules, parsing paths with the levels separator
    pub fn from_rules(
        repository: &str,
        hub: &str,
        rules: &[MappingRule],
        separator: &str,
    ) -> Result<Self, MappingError> {
        let mut plan = MappingPlan::default();

        for rule in rules {
            match rule {
                MappingRule::Dynamic { language, script } => {
                    if plan.dynamic.is_some() {
                        return Err(MappingError::MultipleDynamic {
                            repository: repository.to_string(),
                            hub: hub.to_string(),
                        });
                    }
                    if script.trim().is_empty() {
                        return Err(MappingError::InvalidRule(
                            "dynamic mapping has an empty script".to_string(),
                        ));
                    }
                    plan.dynamic = Some(DynamicMapping {
                        language: language.clone(),
                        script: script.clone(),
                    });
                }
                MappingRule::Static {
                    source,
                    destination,
                } => {
                    let source_path = AttributePath::parse(source, separator);
                    let destination_path = AttributePath::parse(destination, separator);
                    if source_path.is_empty() || destination_path.is_empty() {
                        return Err(MappingError::InvalidRule(format!(
                            "static mapping {source:?} -> {destination:?} needs both paths"
                        )));
                    }
                    plan.statics.push(StaticMapping {
                        source: source_path,
                        destination: destination_path,
                    });
                }
            }
        }

        Ok(plan)
    }

    pub fn is_empty(&self) -> bool {
        self.dynamic.is_none() && self.statics.is_empty()
    }
}

/// Overlay static mappings onto `base`
///
/// One value found at the source is copied as is, several are kept as a
/// list, and a missing source writes an empty list.
pub fn apply_static(mut base: Record, raw: &Record, statics: &[StaticMapping]) -> Record {
    for mapping in statics {
        let mut found = Vec::new();
        if let Some((first, rest)) = mapping.source.segments().split_first() {
            if let Some(value) = raw.get(first) {
                collect(value, rest, &mut found);
            }
        }

        let value = match found.len() {
            1 => found.swap_remove(0),
            _ => Value::Array(found),
        };
        insert_at(&mut base, mapping.destination.segments(), value);
    }
    base
}

/// Gather the values at `segments` below `value`, walking through lists
fn collect(value: &Value, segments: &[String], out: &mut Vec<Value>) {
    match (value, segments.split_first()) {
        (Value::Array(items), _) => {
            for item in items {
                collect(item, segments, out);
            }
        }
        (Value::Object(map), Some((head, rest))) => {
            if let Some(child) = map.get(head) {
                collect(child, rest, out);
            }
        }
        (Value::Null, None) => {}
        (leaf, None) => out.push(leaf.clone()),
        _ => {}
    }
}

/// Write `value` at `segments`, replacing anything in the way
fn insert_at(target: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = target;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(map) = entry else {
            return;
        };
        current = map;
    }
    current.insert(last.clone(), value);
}
