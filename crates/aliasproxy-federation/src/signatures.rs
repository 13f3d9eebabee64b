//! Canonical JSON signing and verification.
//!
//! Matrix signs JSON objects by serialising them as canonical JSON (keys
//! sorted lexicographically, no insignificant whitespace) with the
//! `signatures` and `unsigned` members removed, then attaching the result at
//! `signatures.<server_name>.<key_id>`:
//!
//! ```json
//! {
//!   "server_name": "example.org",
//!   "signatures": { "example.org": { "ed25519:abc": "<base64url signature>" } },
//!   ...
//! }
//! ```
//!
//! Because the signed bytes exclude `signatures`, attaching a signature never
//! changes what a verifier recomputes.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::{
    error::FederationError,
    keys::{ServerKeyPair, verify_signature},
};

/// Members that are never covered by a signature.
const UNSIGNED_FIELDS: [&str; 2] = ["signatures", "unsigned"];

// ─── Signing ─────────────────────────────────────────────────────────────────

/// Sign a JSON object in-place, adding the signature under
/// `signatures.<server_name>.<key_id>`. Existing signatures are kept.
pub fn sign_json(
    kp: &ServerKeyPair,
    server_name: &str,
    value: &mut Value,
) -> Result<(), FederationError> {
    let canonical = signing_payload(value)?;
    let sig = kp.sign_json(&canonical);

    let obj = value.as_object_mut().ok_or(FederationError::NotAnObject)?;
    let signatures = obj
        .entry("signatures")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or(FederationError::NotAnObject)?;
    let by_server = signatures
        .entry(server_name)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or(FederationError::NotAnObject)?;
    by_server.insert(kp.key_id.clone(), Value::String(sig));
    Ok(())
}

/// Verify the signature stored at `signatures.<server_name>.<key_id>`.
///
/// `pubkey_base64` is the unpadded standard base64 key from `verify_keys`.
pub fn verify_json(
    value: &Value,
    server_name: &str,
    key_id: &str,
    pubkey_base64: &str,
) -> Result<(), FederationError> {
    let sig = value
        .get("signatures")
        .and_then(|s| s.get(server_name))
        .and_then(|s| s.get(key_id))
        .and_then(Value::as_str)
        .ok_or(FederationError::InvalidSignature)?;
    let canonical = signing_payload(value)?;
    verify_signature(pubkey_base64, sig, canonical.as_bytes())
}

/// Canonical JSON of `value` with the unsigned members stripped.
pub fn signing_payload(value: &Value) -> Result<String, FederationError> {
    let obj = value.as_object().ok_or(FederationError::NotAnObject)?;
    let stripped: Map<String, Value> = obj
        .iter()
        .filter(|(k, _)| !UNSIGNED_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Ok(canonical_json(&Value::Object(stripped)))
}

// ─── Canonical JSON ──────────────────────────────────────────────────────────

/// Produce canonical JSON (sorted keys, no extra whitespace).
///
/// Keys are re-sorted recursively so the output does not depend on how the
/// `serde_json` map type orders its entries.
pub fn canonical_json(value: &Value) -> String {
    sort_keys(value).to_string()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), sort_keys(v)))
                .collect::<BTreeMap<_, _>>()
                .into_iter()
                .collect();
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}
