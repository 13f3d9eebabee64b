//! Server discovery endpoints.
//!
//! - `GET /.well-known/matrix/server` delegates federation to `server_well_known`.
//! - `GET /_matrix/federation/v1/version` identifies the software.

use aliasproxy_common::{ProxyError, ProxyResult};
use aliasproxy_federation::types::{ServerVersion, WellKnownServer};
use axum::{Json, Router, extract::State, routing::get};
use std::sync::Arc;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/.well-known/matrix/server", get(well_known_server))
        .route("/_matrix/federation/v1/version", get(server_version))
}

async fn well_known_server(
    State(state): State<Arc<AppState>>,
) -> ProxyResult<Json<WellKnownServer>> {
    state
        .server_well_known
        .clone()
        .map(|server| Json(WellKnownServer { server }))
        .ok_or(ProxyError::NoWellKnown)
}

async fn server_version() -> Json<ServerVersion> {
    Json(ServerVersion::current())
}
