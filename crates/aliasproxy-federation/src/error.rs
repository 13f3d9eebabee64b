//! Federation-specific error types.

use thiserror::Error;

/// Errors that can occur while resolving aliases or producing server keys.
#[derive(Debug, Error)]
pub enum FederationError {
    // ── Key management ──────────────────────────────────────────────────────

    #[error("No server keys found for '{0}'")]
    KeyNotFound(String),

    #[error("Failed to load signing key: {0}")]
    KeyLoad(String),

    #[error("Invalid signing key for '{domain}': {reason}")]
    InvalidServerKey { domain: String, reason: String },

    // ── Signature verification ───────────────────────────────────────────────

    #[error("Signature verification failed")]
    InvalidSignature,

    #[error("Signed document must be a JSON object")]
    NotAnObject,

    // ── Alias rules ─────────────────────────────────────────────────────────

    #[error("Failed to compile pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    // ── Remote communication ─────────────────────────────────────────────────

    #[error("Homeserver URL cannot be used for lookups: {0}")]
    InvalidHomeserver(String),

    #[error("HTTP error communicating with homeserver '{0}': {1}")]
    RemoteHttp(String, String),

    #[error("Resolving {0} responded with HTTP {1}")]
    RemoteStatus(String, u16),

    #[error("Failed to parse response when resolving {0}: {1}")]
    RemoteProtocol(String, String),

    // ── General ─────────────────────────────────────────────────────────────

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}

impl From<reqwest::Error> for FederationError {
    fn from(e: reqwest::Error) -> Self {
        let server = e.url().map(|u| u.host_str().unwrap_or("?").to_owned()).unwrap_or_default();
        FederationError::RemoteHttp(server, e.to_string())
    }
}
