//! Fingerprints - SHA-256 over canonical JSON
//!
//! Identical engine outputs hash identically regardless of field order, so an
//! export collaborator can tell whether a sheet actually changed.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data).iter().map(|b| format!("{:02x}", b)).collect()
}

/// JSON with object keys sorted at every depth and no whitespace
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v = serde_json::to_value(value)?;
    serde_json::to_string(&sorted(v))
}

fn sorted(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sorted(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

/// fingerprint = sha256("{kind}:{engine_version}:{canonical body}")
pub fn fingerprint<T: Serialize>(
    kind: &str,
    engine_version: &str,
    body: &T,
) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(body)?;
    Ok(sha256_hex(format!("{}:{}:{}", kind, engine_version, canonical).as_bytes()))
}
