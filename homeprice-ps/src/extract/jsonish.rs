//! Near-JSON field normalization and nested-fact lookup
//!
//! The scraped `homeFacts` and `schools` blobs are near-JSON: single
//! quotes and Python-style `None` literals. They are normalized to
//! strict JSON by a fixed substitution table before parsing.

use serde_json::Value;

/// Normalize a near-JSON blob to a strict-JSON string.
///
/// Substitution order matters and mirrors the scraper's quoting
/// conventions; `None` becomes an empty-string placeholder.
pub fn normalize_jsonish(value: &str) -> String {
    value
        .replace('"', "'")
        .replace("{'", "{\"")
        .replace("['", "[\"")
        .replace("':", "\":")
        .replace(": '", ": \"")
        .replace("', ", "\", ")
        .replace(", '", ", \"")
        .replace("'}", "\"}")
        .replace("']", "\"]")
        .replace(": None,", ": \"\",")
        .replace("\", None, \"", "\", \"\", \"")
}

/// Parse a near-JSON blob; unparsable input yields `None`
pub fn parse_jsonish(value: &str) -> Option<Value> {
    serde_json::from_str(&normalize_jsonish(value)).ok()
}

/// Look up a named sub-fact in the `homeFacts` blob.
///
/// Returns `None` when the blob is unparsable, the label is absent, or
/// the fact value is empty.
pub fn subfact(home_facts: &str, label: &str) -> Option<String> {
    let parsed = parse_jsonish(home_facts)?;
    let facts = parsed.get("atAGlanceFacts")?.as_array()?;
    for fact in facts {
        if fact.get("factLabel").and_then(Value::as_str) == Some(label) {
            let value = fact.get("factValue").and_then(Value::as_str)?;
            return if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }
    }
    None
}
