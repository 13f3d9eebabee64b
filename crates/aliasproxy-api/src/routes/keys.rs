//! Server key documents.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET    | `/_matrix/key/v2/server` | Key document for the domain in the `Host` header |
//! | GET    | `/_matrix/key/v2/query/{serverName}` | Key document for `serverName` |
//!
//! Documents are signed per request. Domains without an identity (and no
//! `default` identity) get `404 No server keys found`.

use aliasproxy_common::{ProxyError, ProxyResult};
use aliasproxy_federation::KeyResponse;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, Uri, header::HOST},
    routing::get,
};
use std::sync::Arc;
use tracing::debug;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/_matrix/key/v2/server", get(server_key))
        .route("/_matrix/key/v2/query/{server_name}", get(query_key))
}

/// `GET /_matrix/key/v2/server`
async fn server_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
) -> ProxyResult<Json<KeyResponse>> {
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or_default();
    signed_key_document(&state, host_without_port(host))
}

/// `GET /_matrix/key/v2/query/{serverName}`
async fn query_key(
    State(state): State<Arc<AppState>>,
    Path(server_name): Path<String>,
) -> ProxyResult<Json<KeyResponse>> {
    signed_key_document(&state, &server_name)
}

fn signed_key_document(state: &AppState, domain: &str) -> ProxyResult<Json<KeyResponse>> {
    state.signer.server_key_for(domain).map(Json).map_err(|e| {
        debug!("No key document for {}: {}", domain, e);
        ProxyError::NoServerKeys
    })
}

/// Strip an optional `:port` from a `Host` value. IPv6 literals lose their
/// brackets.
fn host_without_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}
