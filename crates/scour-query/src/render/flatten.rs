//! Post-passes over compiled query documents.

use serde_json::{json, Map, Value};

/// Lists whose redundant `bool` wrappers are spliced into the parent.
///
/// `must_not` is absent: two separate negations are not one negation.
const FLATTENED_LISTS: [&str; 3] = ["filter", "must", "should"];

/// Splice `{"bool": {k: [...]}}` items into a parent `k` list, bottom-up.
///
/// Only wrappers whose `bool` object holds nothing but the parent's key are
/// removed; a wrapper with a boost, parameters or a second list stays. A
/// parent carrying parameters other than `boost` is left untouched.
pub fn flatten_bool_clauses(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut flattened: Map<String, Value> = map
                .into_iter()
                .map(|(key, child)| (key, flatten_bool_clauses(child)))
                .collect();

            if let Some(Value::Object(bool_body)) = flattened.get_mut("bool") {
                splice_lists(bool_body);
            }
            Value::Object(flattened)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(flatten_bool_clauses).collect()),
        other => other,
    }
}

fn splice_lists(bool_body: &mut Map<String, Value>) {
    if !accepts_splices(bool_body) {
        return;
    }

    for key in FLATTENED_LISTS {
        let Some(Value::Array(items)) = bool_body.get_mut(key) else {
            continue;
        };

        let mut spliced = Vec::with_capacity(items.len());
        for mut item in items.drain(..) {
            if !is_sole_list(&item, key) {
                spliced.push(item);
                continue;
            }
            if let Value::Array(inner) = item["bool"][key].take() {
                spliced.extend(inner);
            }
        }
        *items = spliced;
    }
}

/// A parent holding only lists and a boost; options such as
/// `minimum_should_match` count its direct children.
fn accepts_splices(bool_body: &Map<String, Value>) -> bool {
    bool_body
        .keys()
        .all(|key| key == "boost" || key == "must_not" || FLATTENED_LISTS.contains(&key.as_str()))
}

/// `{"bool": {key: [...]}}` and nothing else
fn is_sole_list(item: &Value, key: &str) -> bool {
    let Some(outer) = item.as_object() else {
        return false;
    };
    if outer.len() != 1 {
        return false;
    }
    match outer.get("bool").and_then(Value::as_object) {
        Some(inner) => inner.len() == 1 && matches!(inner.get(key), Some(Value::Array(_))),
        None => false,
    }
}

/// Combine a caller's raw query clause with a compiled one.
///
/// Both present: `{"bool": {"must": [raw, compiled]}}`. Otherwise the one
/// that is present passes through. `null` counts as absent.
pub fn merge_queries(raw: Option<Value>, compiled: Option<Value>) -> Option<Value> {
    let raw = raw.filter(|value| !value.is_null());
    let compiled = compiled.filter(|value| !value.is_null());

    match (raw, compiled) {
        (Some(raw), Some(compiled)) => Some(json!({"bool": {"must": [raw, compiled]}})),
        (Some(raw), None) => Some(raw),
        (None, compiled) => compiled,
    }
}
