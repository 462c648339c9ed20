// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Operations on the `{name}` reference lists of a service account.
//!
//! Lists are handled as raw JSON so entries carrying more than a name
//! (`secrets` holds full object references) are written back untouched.

use serde_json::{json, Value};

/// Entries of a reference list. Anything that is not an array reads as empty.
fn entries(list: &Value) -> &[Value] {
    match list {
        Value::Array(items) => items,
        _ => &[],
    }
}

fn reference_name(entry: &Value) -> Option<&str> {
    entry.get("name").and_then(Value::as_str)
}

/// True when `list` is present as an array with no entries
pub fn is_empty_list(list: &Value) -> bool {
    matches!(list, Value::Array(items) if items.is_empty())
}

/// Check if any entry of `list` references `name`
pub fn contains_reference(list: &Value, name: &str) -> bool {
    entries(list)
        .iter()
        .any(|entry| reference_name(entry) == Some(name))
}

/// Copy of `list` with a `{name}` entry appended. No duplicate check.
pub fn append_reference(list: &Value, name: &str) -> Vec<Value> {
    let mut items = entries(list).to_vec();
    items.push(json!({ "name": name }));
    items
}

/// Copy of `list` with a `{name}` entry appended unless one is already there
pub fn ensure_reference(list: &Value, name: &str) -> Vec<Value> {
    if contains_reference(list, name) {
        entries(list).to_vec()
    } else {
        append_reference(list, name)
    }
}

/// Copy of `list` without the entries whose name equals `name`
pub fn remove_reference(list: &Value, name: &str) -> Vec<Value> {
    entries(list)
        .iter()
        .filter(|entry| reference_name(entry) != Some(name))
        .cloned()
        .collect()
}
