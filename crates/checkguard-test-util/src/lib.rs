//! Shared test utilities for the checkguard workspace.
//!
//! This crate exists because `xtask` needs `normalize_nondeterministic` at
//! runtime (not behind `#[cfg(test)]`), so a `#[cfg(test)]` module inside
//! `checkguard-types` would not suffice.

use serde_json::Value;

/// Placeholder for the run id of a normalized report.
pub const RUN_ID_PLACEHOLDER: &str = "<run_id>";

/// Normalize the fields of an engine report that legitimately vary per run.
///
/// - root-only: `run_id` is replaced with [`RUN_ID_PLACEHOLDER`] when the root
///   looks like a report (has `schema_version`, `tool`, `run_id`, and `checks`).
/// - recursive: `duration_ms` becomes `0` at any depth.
pub fn normalize_nondeterministic(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        let is_report = obj.contains_key("schema_version")
            && obj.contains_key("tool")
            && obj.contains_key("run_id")
            && obj.contains_key("checks");
        if is_report {
            obj.insert(
                "run_id".to_string(),
                Value::String(RUN_ID_PLACEHOLDER.to_string()),
            );
        }
    }
    normalize_durations_recursive(&mut value);
    value
}

fn normalize_durations_recursive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.contains_key("duration_ms") {
                map.insert("duration_ms".to_string(), Value::Number(0.into()));
            }
            for val in map.values_mut() {
                normalize_durations_recursive(val);
            }
        }
        Value::Array(arr) => {
            for val in arr.iter_mut() {
                normalize_durations_recursive(val);
            }
        }
        _ => {}
    }
}
