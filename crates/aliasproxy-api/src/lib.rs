//! # aliasproxy-api
//!
//! HTTP surface of aliasproxy. Serves the handful of federation endpoints a
//! remote homeserver needs to resolve aliases and fetch server keys; every
//! other path answers `404 M_NOT_FOUND`.

pub mod routes;

use aliasproxy_federation::{AliasMapper, DirectoryResolver, KeySigner};
use axum::Router;
use std::sync::Arc;

/// Shared application state available to all route handlers.
///
/// Everything except the directory cache is immutable after startup.
#[derive(Clone)]
pub struct AppState {
    /// Static and pattern alias rewrites.
    pub aliases: Arc<AliasMapper>,
    /// Cached room directory lookups against the homeserver.
    pub directory: Arc<DirectoryResolver>,
    /// Per-domain Ed25519 identities for `/_matrix/key/v2/*`.
    pub signer: Arc<KeySigner>,
    /// Published as `m.server` at `/.well-known/matrix/server`.
    pub server_well_known: Option<String>,
}

/// Build the complete router with all routes and middleware.
///
/// Key routes are only mounted when at least one identity is configured.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(routes::federation::router())
        .merge(routes::discovery::router());
    if !state.signer.is_empty() {
        router = router.merge(routes::keys::router());
    }

    router
        .fallback(routes::not_found)
        .method_not_allowed_fallback(routes::not_found)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
