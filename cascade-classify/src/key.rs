//! Cache key construction.
//!
//! The key composes the function name, a digest of the
//! whitespace-normalized description, and the canonical digest of the
//! input schema. A changed schema invalidates the classification;
//! description whitespace differences do not.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Canonical JSON encoding: object keys sorted, no whitespace.
/// Two structurally equal schemas digest identically regardless of
/// key order.
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        Value::String(k.clone()),
                        canonical_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        scalar => scalar.to_string(),
    }
}

/// SHA-256 hex digest of a schema's canonical encoding.
pub fn schema_digest(schema: &Value) -> String {
    hex::encode(Sha256::digest(canonical_json(schema).as_bytes()))
}

/// Collapse runs of whitespace so formatting differences don't
/// invalidate cached classifications.
fn normalize_description(description: &str) -> String {
    description.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compose the URL-safe cache key.
pub fn cache_key(name: &str, description: &str, schema_digest: &str) -> String {
    let name: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let description_digest =
        hex::encode(Sha256::digest(normalize_description(description).as_bytes()));
    format!("classify:{name}:{description_digest}:{schema_digest}")
}
