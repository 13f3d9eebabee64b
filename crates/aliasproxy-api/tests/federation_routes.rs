//! Router tests against a fake homeserver.
//!
//! The homeserver is a small axum app bound to an ephemeral port; the proxy
//! router is driven in-process with `tower::ServiceExt::oneshot`.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU16, AtomicUsize, Ordering},
    },
    time::Duration,
};

use aliasproxy_api::{AppState, build_router};
use aliasproxy_common::config::{PatternConfig, ServerKeyConfig};
use aliasproxy_federation::{
    AliasMapper, DirectoryResolver, HomeserverClient, KeySigner, ServerKeyPair,
    signatures::verify_json,
};
use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

// ─── Fake homeserver ─────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeHomeserver {
    /// Status to answer with; 0 means 200 with a room.
    status: AtomicU16,
    calls: AtomicUsize,
}

impl FakeHomeserver {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail_with(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }
}

async fn directory_room(
    State(hs): State<Arc<FakeHomeserver>>,
    Path(alias): Path<String>,
) -> Response {
    hs.calls.fetch_add(1, Ordering::SeqCst);
    if alias.starts_with("#slow") {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
    if alias.starts_with("#garbage") {
        return (StatusCode::OK, "not json").into_response();
    }
    match hs.status.load(Ordering::SeqCst) {
        0 => {
            let (local, server) = alias.trim_start_matches('#').split_once(':').unwrap();
            Json(json!({
                "room_id": format!("!{local}:{server}"),
                "servers": [server, "other.example"],
            }))
            .into_response()
        }
        code => (
            StatusCode::from_u16(code).unwrap(),
            Json(json!({ "errcode": "M_UNKNOWN", "error": "boom" })),
        )
            .into_response(),
    }
}

async fn spawn_homeserver() -> (Arc<FakeHomeserver>, Url) {
    let hs = Arc::new(FakeHomeserver::default());
    let app = Router::new()
        .route("/_matrix/client/v3/directory/room/{alias}", get(directory_room))
        .with_state(hs.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (hs, Url::parse(&format!("http://{addr}")).unwrap())
}

// ─── Proxy setup ─────────────────────────────────────────────────────────────

fn signing_key(byte: u8, version: &str) -> String {
    ServerKeyPair::from_seed(version, &[byte; 32]).unwrap().to_config_string()
}

struct Proxy {
    router: Router,
    hs: Arc<FakeHomeserver>,
}

async fn proxy(server_keys: HashMap<String, ServerKeyConfig>) -> Proxy {
    let (hs, base) = spawn_homeserver().await;

    let mut aliases = HashMap::new();
    aliases.insert("#foo:old.example".to_owned(), "#abc:new.example".to_owned());
    let patterns = vec![PatternConfig {
        pattern: r"^#(.*):old\.example$".into(),
        replacement: "#$1:new.example".into(),
    }];

    let client = HomeserverClient::new(base, Some(Duration::from_millis(500))).unwrap();
    let state = AppState {
        aliases: Arc::new(AliasMapper::from_config(&aliases, &patterns).unwrap()),
        directory: Arc::new(DirectoryResolver::new(client, Duration::from_secs(60))),
        signer: Arc::new(KeySigner::from_config(&server_keys).unwrap()),
        server_well_known: Some("matrix.new.example:443".into()),
    };
    Proxy { router: build_router(state), hs }
}

fn default_keys() -> HashMap<String, ServerKeyConfig> {
    let mut keys = HashMap::new();
    keys.insert(
        "example.org".to_owned(),
        ServerKeyConfig { server_name: None, signing_key: signing_key(1, "org") },
    );
    keys.insert(
        "default".to_owned(),
        ServerKeyConfig { server_name: None, signing_key: signing_key(2, "dflt") },
    );
    keys
}

async fn get_json(router: &Router, uri: &str, host: Option<&str>) -> (StatusCode, Value) {
    let mut req = Request::builder().uri(uri);
    if let Some(host) = host {
        req = req.header(header::HOST, host);
    }
    let resp = router.clone().oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
    let status = resp.status();
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn directory_uri(alias: &str) -> String {
    format!(
        "/_matrix/federation/v1/query/directory?room_alias={}",
        alias.replace('#', "%23").replace(':', "%3A")
    )
}

// ─── Directory queries ───────────────────────────────────────────────────────

#[tokio::test]
async fn static_alias_is_proxied_verbatim() {
    let p = proxy(HashMap::new()).await;
    let (status, body) = get_json(&p.router, &directory_uri("#foo:old.example"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "room_id": "!abc:new.example", "servers": ["new.example", "other.example"] })
    );
}

#[tokio::test]
async fn pattern_alias_is_rewritten() {
    let p = proxy(HashMap::new()).await;
    let (status, body) = get_json(&p.router, &directory_uri("#bar:old.example"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room_id"], "!bar:new.example");
}

#[tokio::test]
async fn unmapped_alias_is_not_found() {
    let p = proxy(HashMap::new()).await;
    let (status, body) = get_json(&p.router, &directory_uri("#bar:elsewhere.example"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({ "errcode": "M_NOT_FOUND", "error": "Room alias #bar:elsewhere.example not found" })
    );
    assert_eq!(p.hs.calls(), 0);

    let (status, _) =
        get_json(&p.router, "/_matrix/federation/v1/query/directory", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cached_answer_survives_upstream_failure_within_ttl() {
    let p = proxy(HashMap::new()).await;
    let (_, first) = get_json(&p.router, &directory_uri("#bar:old.example"), None).await;
    p.hs.fail_with(500);
    let (status, second) = get_json(&p.router, &directory_uri("#bar:old.example"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(p.hs.calls(), 1);
}

#[tokio::test]
async fn upstream_error_is_cached_as_not_found() {
    let p = proxy(HashMap::new()).await;
    p.hs.fail_with(500);
    for _ in 0..2 {
        let (status, body) = get_json(&p.router, &directory_uri("#new:old.example"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errcode"], "M_NOT_FOUND");
        assert_eq!(body["error"], "Failed to resolve #new:new.example");
    }
    assert_eq!(p.hs.calls(), 1);
}

#[tokio::test]
async fn undecodable_upstream_body_is_not_found() {
    let p = proxy(HashMap::new()).await;
    let (status, _) = get_json(&p.router, &directory_uri("#garbage:old.example"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn slow_upstream_times_out_as_not_found() {
    let p = proxy(HashMap::new()).await;
    let (status, body) = get_json(&p.router, &directory_uri("#slow:old.example"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Failed to resolve #slow:new.example");
}

// ─── Server keys ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn server_key_uses_host_header_domain() {
    let p = proxy(default_keys()).await;
    let (status, body) =
        get_json(&p.router, "/_matrix/key/v2/server", Some("example.org:8448")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["server_name"], "example.org");
    assert_eq!(body["old_verify_keys"], json!({}));

    let expected = ServerKeyPair::from_seed("org", &[1u8; 32]).unwrap();
    assert_eq!(body["verify_keys"]["ed25519:org"]["key"], expected.public_key_base64());
    verify_json(&body, "example.org", "ed25519:org", &expected.public_key_base64()).unwrap();
}

#[tokio::test]
async fn key_query_falls_back_to_default_identity() {
    let p = proxy(default_keys()).await;
    let (status, body) = get_json(&p.router, "/_matrix/key/v2/query/unknown.org", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["server_name"], "unknown.org");

    let default = ServerKeyPair::from_seed("dflt", &[2u8; 32]).unwrap();
    verify_json(&body, "unknown.org", "ed25519:dflt", &default.public_key_base64()).unwrap();
}

#[tokio::test]
async fn key_query_without_matching_identity_is_not_found() {
    let mut keys = default_keys();
    keys.remove("default");
    let p = proxy(keys).await;
    let (status, body) = get_json(&p.router, "/_matrix/key/v2/query/unknown.org", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "errcode": "M_NOT_FOUND", "error": "No server keys found" }));
}

#[tokio::test]
async fn key_routes_are_absent_without_identities() {
    let p = proxy(HashMap::new()).await;
    let (status, body) =
        get_json(&p.router, "/_matrix/key/v2/server", Some("example.org")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errcode"], "M_NOT_FOUND");
}

// ─── Discovery & fallback ────────────────────────────────────────────────────

#[tokio::test]
async fn well_known_and_version_are_served() {
    let p = proxy(HashMap::new()).await;
    let (status, body) = get_json(&p.router, "/.well-known/matrix/server", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "m.server": "matrix.new.example:443" }));

    let (status, body) = get_json(&p.router, "/_matrix/federation/v1/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["server"]["name"], "aliasproxy");
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let p = proxy(default_keys()).await;
    for uri in ["/", "/_matrix/client/v3/login", "/_matrix/key/v2/query/a/b"] {
        let (status, body) = get_json(&p.router, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["errcode"], "M_NOT_FOUND");
    }

    let req = Request::builder()
        .method("POST")
        .uri(directory_uri("#foo:old.example"))
        .body(Body::empty())
        .unwrap();
    let resp = p.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
