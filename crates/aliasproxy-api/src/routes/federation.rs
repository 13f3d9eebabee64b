//! Federation room directory query.
//!
//! `GET /_matrix/federation/v1/query/directory?room_alias=<alias>`
//!
//! The alias is rewritten by the [`AliasMapper`](aliasproxy_federation::AliasMapper)
//! and the rewritten alias is resolved against the homeserver through the
//! directory cache. Unmapped aliases and failed resolutions are both `404`.

use aliasproxy_common::{ProxyError, ProxyResult};
use aliasproxy_federation::RoomDirectoryResponse;
use axum::{
    Json, Router,
    extract::{RawQuery, State},
    routing::get,
};
use std::sync::Arc;
use tracing::debug;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/_matrix/federation/v1/query/directory", get(query_directory))
}

async fn query_directory(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> ProxyResult<Json<RoomDirectoryResponse>> {
    let alias = room_alias_param(query.as_deref().unwrap_or_default());
    let Some(target) = state.aliases.resolve(&alias) else {
        debug!("No mapping for alias {}", alias);
        return Err(ProxyError::AliasNotFound(alias));
    };
    debug!("Alias {} maps to {}", alias, target);

    state
        .directory
        .resolve(&target)
        .await
        .to_response()
        .map(Json)
        .ok_or(ProxyError::ResolutionFailed(target))
}

/// First `room_alias` value in the query string, or `""` when absent.
fn room_alias_param(query: &str) -> String {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "room_alias")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::room_alias_param;

    #[test]
    fn room_alias_is_decoded() {
        assert_eq!(room_alias_param("room_alias=%23foo%3Aold.example"), "#foo:old.example");
        assert_eq!(room_alias_param("x=1&room_alias=%23a:b&room_alias=%23c:d"), "#a:b");
        assert_eq!(room_alias_param(""), "");
        assert_eq!(room_alias_param("other=1"), "");
    }
}
