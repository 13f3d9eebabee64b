//! Wire types for the federation endpoints served by aliasproxy.
//!
//! Maps use `BTreeMap` so that serialisation order is deterministic, which
//! keeps signed documents stable across serialise/verify cycles.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ─── Room directory ──────────────────────────────────────────────────────────

/// Body of a room directory lookup, both as returned by the homeserver's
/// client API and as served to federating servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDirectoryResponse {
    pub room_id: String,
    #[serde(default)]
    pub servers: Vec<String>,
}

// ─── Server keys ─────────────────────────────────────────────────────────────

/// A single public verify key entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyKey {
    /// Unpadded standard base64 Ed25519 public key.
    pub key: String,
}

/// `server_name → key_id → signature`
pub type Signatures = BTreeMap<String, BTreeMap<String, String>>;

/// The signed key document served at `/_matrix/key/v2/server`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyResponse {
    pub server_name: String,
    /// Unix millisecond timestamp after which this document should be re-fetched.
    pub valid_until_ts: i64,
    pub verify_keys: BTreeMap<String, VerifyKey>,
    #[serde(default)]
    pub old_verify_keys: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub signatures: Signatures,
}

// ─── Discovery ───────────────────────────────────────────────────────────────

/// Response for `/.well-known/matrix/server`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellKnownServer {
    #[serde(rename = "m.server")]
    pub server: String,
}

/// Response for `/_matrix/federation/v1/version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerVersion {
    pub server: ServerImplementation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerImplementation {
    pub name: String,
    pub version: String,
}

impl ServerVersion {
    pub fn current() -> Self {
        Self {
            server: ServerImplementation {
                name: "aliasproxy".to_owned(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
            },
        }
    }
}
