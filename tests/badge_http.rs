use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::get as get_route,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use badge_gen::{
    badge::BadgeRenderer,
    cache::{Cache, InMemoryCache},
    config::{Config, ConfigStore, UpstreamConfig},
    services::{HandlerDependencies, ServiceRegistry, register_builtin_handlers},
    utils::UpstreamClient,
    web::{AppState, create_router},
};

fn test_app_with_cache(cache: Arc<InMemoryCache>) -> Router {
    test_app_with(cache, ConfigStore::new())
}

fn test_app_with(cache: Arc<InMemoryCache>, config: ConfigStore) -> Router {
    let deps = HandlerDependencies {
        cache: cache.clone(),
        http: UpstreamClient::new(&UpstreamConfig::default()).unwrap(),
        config: Arc::new(config),
    };
    let mut registry = ServiceRegistry::new();
    register_builtin_handlers(&mut registry, &deps).unwrap();

    create_router(AppState {
        registry: Arc::new(registry),
        renderer: Arc::new(BadgeRenderer::new().unwrap()),
        cache,
        config: Arc::new(Config::default()),
    })
}

fn test_app() -> Router {
    test_app_with_cache(Arc::new(InMemoryCache::new()))
}

async fn get(app: &Router, uri: &str, if_none_match: Option<&str>) -> axum::response::Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(etag) = if_none_match {
        builder = builder.header(header::IF_NONE_MATCH, etag);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_static_badge_renders_svg() {
    let app = test_app();
    let response = get(&app, "/static/API/Documentation/4c1", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    let etag = response.headers()[header::ETAG].to_str().unwrap().to_string();
    assert_eq!(etag.len(), 64);

    let svg = body_string(response).await;
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains(r#"width="133""#));
    assert!(svg.contains(">API</text>"));
    assert!(svg.contains(">Documentation</text>"));
    assert!(svg.contains("#4c1"));
    assert!(!svg.contains("<!--"));
}

#[tokio::test]
async fn test_static_badge_defaults_color() {
    let app = test_app();
    let with_color = get(&app, "/static/API/Documentation/4c1", None).await;
    let without_color = get(&app, "/static/API/Documentation", None).await;

    assert_eq!(without_color.status(), StatusCode::OK);
    assert_eq!(
        with_color.headers()[header::ETAG],
        without_color.headers()[header::ETAG]
    );
}

#[tokio::test]
async fn test_named_colors_resolve() {
    let app = test_app();
    let named = get(&app, "/static/build/passing/brightgreen", None).await;
    let hex = get(&app, "/static/build/passing/4c1", None).await;

    assert_eq!(named.headers()[header::ETAG], hex.headers()[header::ETAG]);
}

#[tokio::test]
async fn test_path_segments_are_decoded_and_escaped() {
    let app = test_app();
    let response = get(&app, "/static/a%20%3Cb%3E/c%2Fd", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let svg = body_string(response).await;
    assert!(svg.contains(">a &lt;b&gt;</text>"));
    assert!(svg.contains(">c/d</text>"));
    assert!(!svg.contains("<b>"));
}

#[tokio::test]
async fn test_conditional_get_returns_not_modified() {
    let app = test_app();
    let first = get(&app, "/static/API/Documentation/4c1", None).await;
    let etag = first.headers()[header::ETAG].to_str().unwrap().to_string();

    for candidate in [etag.clone(), format!("\"{etag}\""), format!("W/\"{etag}\"")] {
        let response = get(&app, "/static/API/Documentation/4c1", Some(&candidate)).await;
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(response.headers()[header::ETAG], etag.as_str());
        assert!(body_string(response).await.is_empty());
    }

    let stale = get(&app, "/static/API/Documentation/4c1", Some("deadbeef")).await;
    assert_eq!(stale.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_conditional_get_on_cold_cache() {
    let fresh = test_app();
    let etag = get(&fresh, "/static/API/Documentation/4c1", None)
        .await
        .headers()[header::ETAG]
        .to_str()
        .unwrap()
        .to_string();

    let other = test_app();
    let response = get(&other, "/static/API/Documentation/4c1", Some(&etag)).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn test_rendered_badges_are_cached() {
    let cache = Arc::new(InMemoryCache::new());
    let app = test_app_with_cache(cache.clone());

    let response = get(&app, "/static/API/Documentation/4c1", None).await;
    let etag = response.headers()[header::ETAG].to_str().unwrap().to_string();
    let svg = body_string(response).await;

    assert_eq!(cache.get("badge_svg", &etag).unwrap(), Some(svg.clone()));

    let again = get(&app, "/static/API/Documentation/4c1", None).await;
    assert_eq!(again.headers()[header::ETAG], etag.as_str());
    assert_eq!(body_string(again).await, svg);
}

#[tokio::test]
async fn test_unknown_and_disabled_services_are_not_found() {
    let app = test_app();

    let unknown = get(&app, "/nope/a/b", None).await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(unknown).await, "Service not found: nope");

    let disabled = get(&app, "/twitch/views/someone", None).await;
    assert_eq!(disabled.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(disabled).await, "Service not found: twitch");
}

#[tokio::test]
async fn test_missing_parameters_are_client_errors() {
    let app = test_app();

    let response = get(&app, "/static/onlyone", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.starts_with("Error while executing service: executing service static:"));
    assert!(body.contains("You need to provide title and text"));

    let response = get(&app, "/github/nonsense/a/b", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        body_string(response)
            .await
            .contains("An unknown service command was called: nonsense")
    );
}

#[tokio::test]
async fn test_malformed_escapes_are_client_errors() {
    let app = test_app();

    for uri in ["/static/100%zz/b", "/static/100%/b", "/static/a/%4"] {
        let response = get(&app, uri, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert!(body_string(response).await.starts_with("Invalid path encoding"));
    }
}

#[tokio::test]
async fn test_handler_failure_is_server_error() {
    let upstream = Router::new().route(
        "/repos/{user}/{repo}/license",
        get_route(|| async { StatusCode::BAD_GATEWAY }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let config = ConfigStore::new().with("github.api_url", format!("http://{addr}/"));
    let app = test_app_with(Arc::new(InMemoryCache::new()), config);

    let response = get(&app, "/github/license/Luzifer/badge-gen", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert!(response.headers().get(header::ETAG).is_none());

    let body = body_string(response).await;
    assert!(
        body.starts_with(
            "Error while executing service: executing service github: fetching GitHub license:"
        ),
        "{body}"
    );
    assert!(body.contains("502"), "{body}");
}

#[tokio::test]
async fn test_badge_redirect() {
    let app = test_app();

    let response = get(&app, "/v1/badge?title=API&text=Docs%20here&color=blue", None).await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers()[header::LOCATION],
        "/static/API/Docs%20here/blue"
    );

    let response = get(&app, "/v1/badge?title=API&text=Docs", None).await;
    assert_eq!(response.headers()[header::LOCATION], "/static/API/Docs/4c1");

    let response = get(&app, "/v1/badge?title=API", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_string(response).await,
        "You must specify parameters 'title' and 'text'."
    );
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();
    let response = get(&app, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "healthy");
    assert_eq!(json["data"]["version"], env!("CARGO_PKG_VERSION"));
    // twitch stays disabled without credentials
    assert_eq!(json["data"]["services"], 5);
}

#[tokio::test]
async fn test_services_listing() {
    let app = test_app();
    let response = get(&app, "/v1/services", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    let services = json["data"].as_array().unwrap();
    assert!(!services.is_empty());
    assert!(services.iter().all(|s| s["register"] != "twitch"));

    let names: Vec<String> = services
        .iter()
        .map(|s| s["service_name"].as_str().unwrap().to_lowercase())
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);

    let static_entry = services
        .iter()
        .find(|s| s["register"] == "static")
        .unwrap();
    assert_eq!(static_entry["doc_format"], "/static/<title>/<text>/[color]");
}

#[tokio::test]
async fn test_security_headers_on_badges() {
    let app = test_app();
    let response = get(&app, "/static/a/b", None).await;
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
}
