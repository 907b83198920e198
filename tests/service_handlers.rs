//! Service handlers against a local fake of the upstream APIs

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use badge_gen::{
    badge::Badge,
    cache::InMemoryCache,
    config::{ConfigStore, UpstreamConfig},
    errors::{DispatchError, HandlerError, UpstreamError},
    services::{HandlerContext, HandlerDependencies, ServiceRegistry, register_builtin_handlers},
    utils::UpstreamClient,
};

#[derive(Default)]
struct Upstream {
    hits: AtomicUsize,
    token_requests: AtomicUsize,
    failing: AtomicBool,
}

impl Upstream {
    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

type Shared = State<Arc<Upstream>>;

async fn github_license(State(up): Shared, Path((user, _repo)): Path<(String, String)>) -> Response {
    up.hit();
    match user.as_str() {
        "limited" => (
            StatusCode::FORBIDDEN,
            [("x-ratelimit-remaining", "0")],
            "API rate limit exceeded",
        )
            .into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "license": null })).into_response()
        }
        "unlicensed" => Json(json!({ "license": null })).into_response(),
        _ if up.failing.load(Ordering::SeqCst) => StatusCode::BAD_GATEWAY.into_response(),
        _ => Json(json!({ "license": { "name": "MIT License" } })).into_response(),
    }
}

async fn github_tags(State(up): Shared) -> Json<Value> {
    up.hit();
    Json(json!([{ "name": "v0.3.1" }, { "name": "v0.3.0" }]))
}

async fn github_releases(State(up): Shared, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    up.hit();
    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let releases: Vec<Value> = match page {
        1 => (0..100)
            .map(|i| json!({ "tag_name": format!("v1.{i}.0"), "assets": [{ "name": "a.deb", "download_count": 20 }] }))
            .collect(),
        2 => vec![json!({ "tag_name": "v0.1.0", "assets": [{ "name": "a.deb", "download_count": 500 }] })],
        _ => Vec::new(),
    };
    Json(Value::Array(releases))
}

async fn github_latest_release(State(up): Shared) -> Json<Value> {
    up.hit();
    Json(json!({
        "tag_name": "v1.2.3",
        "assets": [
            { "name": "a.deb", "download_count": 1200 },
            { "name": "b.rpm", "download_count": 300 }
        ]
    }))
}

async fn travis_branch(State(up): Shared, Path((_, _, branch)): Path<(String, String, String)>) -> Json<Value> {
    up.hit();
    match branch.as_str() {
        "master" => Json(json!({ "branch": { "state": "passed" } })),
        "broken" => Json(json!({ "branch": { "state": "failed" } })),
        _ => Json(json!({})),
    }
}

async fn aur_rpc(State(up): Shared, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    up.hit();
    if query.get("arg").map(String::as_str) != Some("yay") {
        return Json(json!({ "resultcount": 0, "results": [] }));
    }
    Json(json!({
        "resultcount": 1,
        "results": [{
            "Version": "12.3.5-1",
            "NumVotes": 1514,
            "License": ["GPL-3.0-or-later"],
            "LastModified": 1700000000,
            "OutOfDate": null
        }]
    }))
}

async fn liberapay_profile(State(up): Shared, Path(user): Path<String>) -> Json<Value> {
    up.hit();
    match user.as_str() {
        "Luzifer" => Json(json!({
            "receiving": { "amount": "3.5", "currency": "EUR" },
            "giving": null
        })),
        _ => Json(json!({})),
    }
}

async fn twitch_token(State(up): Shared, Query(query): Query<HashMap<String, String>>) -> Response {
    up.token_requests.fetch_add(1, Ordering::SeqCst);
    if query.get("grant_type").map(String::as_str) != Some("client_credentials") {
        return StatusCode::BAD_REQUEST.into_response();
    }
    // the "eternal" client is handed a lifetime no clock can represent
    let expires_in = match query.get("client_id").map(String::as_str) {
        Some("eternal") => u64::MAX,
        _ => 3600,
    };
    Json(json!({ "access_token": "token-1", "expires_in": expires_in })).into_response()
}

async fn twitch_users(
    State(up): Shared,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    up.hit();
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer token-1") {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match (query.get("login"), query.get("id")) {
        (Some(login), None) if login == "luziferus" => {
            Json(json!({ "data": [{ "view_count": 12345 }] })).into_response()
        }
        (None, Some(id)) if id == "42" => Json(json!({ "data": [{ "view_count": 7 }] })).into_response(),
        _ => Json(json!({ "data": [] })).into_response(),
    }
}

async fn spawn_upstream() -> (SocketAddr, Arc<Upstream>) {
    let upstream = Arc::new(Upstream::default());
    let app = Router::new()
        .route("/github/repos/{user}/{repo}/license", get(github_license))
        .route("/github/repos/{user}/{repo}/tags", get(github_tags))
        .route("/github/repos/{user}/{repo}/releases", get(github_releases))
        .route("/github/repos/{user}/{repo}/releases/latest", get(github_latest_release))
        .route("/travis/repos/{user}/{repo}/branches/{branch}", get(travis_branch))
        .route("/aur/rpc/", get(aur_rpc))
        .route("/liberapay/{user}/public.json", get(liberapay_profile))
        .route("/twitch-auth/oauth2/token", post(twitch_token))
        .route("/twitch/helix/users", get(twitch_users))
        .with_state(upstream.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, upstream)
}

async fn setup() -> (ServiceRegistry, Arc<Upstream>) {
    setup_with_twitch_client("client").await
}

async fn setup_with_twitch_client(client_id: &str) -> (ServiceRegistry, Arc<Upstream>) {
    let (addr, upstream) = spawn_upstream().await;
    let base = format!("http://{addr}");

    let config = ConfigStore::new()
        .with("github.api_url", format!("{base}/github/"))
        .with("travis.api_url", format!("{base}/travis"))
        .with("aur.api_url", format!("{base}/aur"))
        .with("liberapay.api_url", format!("{base}/liberapay"))
        .with("twitch.api_url", format!("{base}/twitch"))
        .with("twitch.auth_url", format!("{base}/twitch-auth"))
        .with("twitch.client_id", client_id)
        .with("twitch.client_secret", "secret");

    let deps = HandlerDependencies {
        cache: Arc::new(InMemoryCache::new()),
        http: UpstreamClient::new(&UpstreamConfig::default()).unwrap(),
        config: Arc::new(config),
    };
    let mut registry = ServiceRegistry::new();
    register_builtin_handlers(&mut registry, &deps).unwrap();
    (registry, upstream)
}

fn ctx() -> HandlerContext {
    HandlerContext::with_timeout(Duration::from_secs(2))
}

async fn dispatch(registry: &ServiceRegistry, path: &str) -> Result<Badge, DispatchError> {
    let mut parts = path.split('/').map(str::to_string);
    let service = parts.next().unwrap();
    let params: Vec<String> = parts.collect();
    registry.dispatch(&service, &params, &ctx()).await
}

#[tokio::test]
async fn test_github_license_is_cached() {
    let (registry, upstream) = setup().await;

    let badge = assert_ok!(dispatch(&registry, "github/license/Luzifer/badge-gen").await);
    assert_eq!(badge, Badge::new("license", "MIT License", "blue"));
    assert_eq!(upstream.hits(), 1);

    let again = assert_ok!(dispatch(&registry, "github/license/Luzifer/badge-gen").await);
    assert_eq!(again, badge);
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_github_missing_license_reads_none() {
    let (registry, _) = setup().await;
    let badge = assert_ok!(dispatch(&registry, "github/license/unlicensed/repo").await);
    assert_eq!(badge.text, "None");
}

#[tokio::test]
async fn test_github_failures_are_not_cached() {
    let (registry, upstream) = setup().await;
    upstream.failing.store(true, Ordering::SeqCst);

    let err = assert_err!(dispatch(&registry, "github/license/Luzifer/badge-gen").await);
    assert!(!err.is_client_error());
    assert!(
        err.to_string()
            .starts_with("executing service github: fetching GitHub license:")
    );
    assert!(err.to_string().contains("HTTP 502"));

    upstream.failing.store(false, Ordering::SeqCst);
    let badge = assert_ok!(dispatch(&registry, "github/license/Luzifer/badge-gen").await);
    assert_eq!(badge.text, "MIT License");
    assert_eq!(upstream.hits(), 2);
}

#[tokio::test]
async fn test_github_rate_limit() {
    let (registry, _) = setup().await;
    let err = assert_err!(dispatch(&registry, "github/license/limited/repo").await);

    assert!(matches!(
        err,
        DispatchError::Failed {
            source: HandlerError::Upstream {
                source: UpstreamError::RateLimited { .. },
                ..
            },
            ..
        }
    ));
}

#[tokio::test]
async fn test_github_latest_tag_marks_prerelease() {
    let (registry, _) = setup().await;
    let badge = assert_ok!(dispatch(&registry, "github/latest-tag/Luzifer/badge-gen").await);
    assert_eq!(badge, Badge::new("tag", "v0.3.1", "orange"));
}

#[tokio::test]
async fn test_github_latest_release() {
    let (registry, _) = setup().await;
    let badge = assert_ok!(dispatch(&registry, "github/latest-release/Luzifer/badge-gen").await);
    assert_eq!(badge, Badge::new("release", "v1.2.3", "blue"));
}

#[tokio::test]
async fn test_github_repo_downloads_follow_pages() {
    let (registry, upstream) = setup().await;
    let badge = assert_ok!(dispatch(&registry, "github/downloads/atom/atom").await);

    // 100 releases * 20 on page one, 500 on page two
    assert_eq!(badge, Badge::new("downloads", "2k", "brightgreen"));
    assert_eq!(upstream.hits(), 2);
}

#[tokio::test]
async fn test_github_release_downloads() {
    let (registry, _) = setup().await;

    let total = assert_ok!(dispatch(&registry, "github/downloads/atom/atom/latest").await);
    assert_eq!(total.text, "1k");

    let asset = assert_ok!(dispatch(&registry, "github/downloads/atom/atom/latest/b.rpm").await);
    assert_eq!(asset.text, "300");

    let err = assert_err!(dispatch(&registry, "github/downloads/a/b/c/d/e").await);
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_deadline_exceeded() {
    let (registry, _) = setup().await;
    let ctx = HandlerContext::with_timeout(Duration::from_millis(200));

    let started = std::time::Instant::now();
    let err = assert_err!(
        registry
            .dispatch("github", &["license".into(), "slow".into(), "repo".into()], &ctx)
            .await
    );

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!err.is_client_error());
    assert!(err.to_string().contains("deadline exceeded"));
}

#[tokio::test]
async fn test_travis_branch_state() {
    let (registry, _) = setup().await;

    let passed = assert_ok!(dispatch(&registry, "travis/Luzifer/badge-gen").await);
    assert_eq!(passed, Badge::new("travis", "passed", "4c1"));

    let failed = assert_ok!(dispatch(&registry, "travis/Luzifer/badge-gen/broken").await);
    assert_eq!(failed.color, "e05d44");

    let unknown = assert_ok!(dispatch(&registry, "travis/Luzifer/badge-gen/missing").await);
    assert_eq!(unknown.text, "unknown");
}

#[tokio::test]
async fn test_aur_commands() {
    let (registry, upstream) = setup().await;

    let version = assert_ok!(dispatch(&registry, "aur/version/yay").await);
    assert_eq!(version, Badge::new("yay", "12.3.5-1", "blue"));

    let votes = assert_ok!(dispatch(&registry, "aur/votes/yay").await);
    assert_eq!(votes.text, "1514 votes");

    let license = assert_ok!(dispatch(&registry, "aur/license/yay").await);
    assert_eq!(license, Badge::new("license", "GPL-3.0-or-later", "blue"));

    let updated = assert_ok!(dispatch(&registry, "aur/updated/yay").await);
    assert_eq!(updated.title, "last updated");
    assert_eq!(updated.text, "2023-11-14 22:13:20");

    // every command caches under its own namespace
    assert_eq!(upstream.hits(), 4);
}

#[tokio::test]
async fn test_aur_unknown_package() {
    let (registry, _) = setup().await;
    let err = assert_err!(dispatch(&registry, "aur/version/does-not-exist").await);

    assert_eq!(
        err.to_string(),
        "executing service aur: fetching AUR info: No package was found"
    );
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn test_liberapay_directions() {
    let (registry, _) = setup().await;

    let receiving = assert_ok!(dispatch(&registry, "liberapay/Luzifer/receiving").await);
    assert_eq!(receiving, Badge::new("receiving", "3.50 EUR", "ffee16"));

    let giving = assert_ok!(dispatch(&registry, "liberapay/Luzifer/giving").await);
    assert_eq!(giving.text, "hidden");

    let err = assert_err!(dispatch(&registry, "liberapay/Luzifer/sideways").await);
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_twitch_token_is_reused() {
    let (registry, upstream) = setup().await;

    let by_login = assert_ok!(dispatch(&registry, "twitch/views/luziferus").await);
    assert_eq!(by_login, Badge::new("views", "12345", "9146FF"));

    let by_id = assert_ok!(dispatch(&registry, "twitch/views/42").await);
    assert_eq!(by_id.text, "7");

    assert_eq!(upstream.token_requests.load(Ordering::SeqCst), 1);

    let err = assert_err!(dispatch(&registry, "twitch/views/nobody").await);
    assert!(err.to_string().contains("unexpected number of users returned"));
}

#[tokio::test]
async fn test_twitch_token_with_oversized_lifetime() {
    let (registry, upstream) = setup_with_twitch_client("eternal").await;

    let badge = assert_ok!(dispatch(&registry, "twitch/views/luziferus").await);
    assert_eq!(badge.text, "12345");

    let again = assert_ok!(dispatch(&registry, "twitch/views/42").await);
    assert_eq!(again.text, "7");
    assert_eq!(upstream.token_requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_upstream_client_status_mapping() {
    let (addr, _) = spawn_upstream().await;
    let client = UpstreamClient::new(&UpstreamConfig::default()).unwrap();

    let missing = client
        .send(&ctx(), client.get(&format!("http://{addr}/nothing-here")))
        .await;
    assert!(matches!(missing, Err(UpstreamError::Status { status: 404, .. })));

    let limited = client
        .send(&ctx(), client.get(&format!("http://{addr}/github/repos/limited/x/license")))
        .await;
    assert!(matches!(limited, Err(UpstreamError::RateLimited { .. })));

    let expired = HandlerContext::with_timeout(Duration::ZERO);
    let result = client
        .send(&expired, client.get(&format!("http://{addr}/github/repos/a/b/tags")))
        .await;
    assert!(matches!(result, Err(UpstreamError::DeadlineExceeded)));
}
