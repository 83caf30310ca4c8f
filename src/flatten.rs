//! Nested record flattening for tabular export

use crate::types::{FlattenedRecord, RemoteRecord};
use serde_json::Value;

/// Flatten a nested record into dot-joined key paths
///
/// Nested objects are recursed into; every other value (including arrays) is kept
/// as-is under its path. When two paths collide, the one produced first wins.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use listmonk_backup::flatten::flatten;
///
/// let record = json!({"a": {"b": 1, "c": {"d": 2}}});
/// let flat = flatten(record.as_object().unwrap());
/// assert_eq!(serde_json::Value::Object(flat), json!({"a.b": 1, "a.c.d": 2}));
/// ```
#[must_use]
pub fn flatten(record: &RemoteRecord) -> FlattenedRecord {
    let mut out = FlattenedRecord::new();
    flatten_into(record, "", &mut out);
    out
}

fn flatten_into(record: &RemoteRecord, prefix: &str, out: &mut FlattenedRecord) {
    for (key, value) in record {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match value {
            Value::Object(nested) => flatten_into(nested, &path, out),
            scalar => {
                out.entry(path).or_insert_with(|| scalar.clone());
            }
        }
    }
}
