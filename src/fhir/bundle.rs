use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// Reads and parses a JSON input file.
///
/// Failure here aborts the whole batch: nothing has been imported yet.
pub fn load_json(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse JSON from {}", path.display()))
}

/// Returns the `resourceType` of a JSON resource object.
pub fn resource_type_of(resource: &Value) -> Option<&str> {
    resource.get("resourceType").and_then(Value::as_str)
}

/// Flattens an input document into the resources whose type is in `wanted`.
///
/// Accepts a single resource object, an array of resources, or a `Bundle`
/// whose `entry[*].resource` holds the resources. Anything else, including
/// resources of other types, is discarded.
pub fn collect_resources(input: Value, wanted: &[&str]) -> Vec<Value> {
    let candidates = match input {
        Value::Array(items) => items,
        Value::Object(obj) if is_bundle(&obj) => bundle_entries(obj),
        Value::Object(obj) => vec![Value::Object(obj)],
        _ => Vec::new(),
    };

    candidates
        .into_iter()
        .filter(|resource| resource_type_of(resource).is_some_and(|t| wanted.contains(&t)))
        .collect()
}

fn is_bundle(obj: &Map<String, Value>) -> bool {
    obj.get("resourceType").and_then(Value::as_str) == Some("Bundle")
}

fn bundle_entries(mut bundle: Map<String, Value>) -> Vec<Value> {
    let Some(Value::Array(entries)) = bundle.remove("entry") else {
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(mut entry) => entry.remove("resource"),
            _ => None,
        })
        .collect()
}
