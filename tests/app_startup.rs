// tests/app_startup.rs
//
// Full service assembly via build_app(): recorder installed before the
// startup fetch, so the first fetches land on /metrics with their HELP text.
// Separate test binary: build_app installs the global recorder.

mod common;

use std::time::Duration;

use serde_json::json;
use shuttle_axum::axum::body::{self, Body};
use shuttle_axum::axum::http::{Request, StatusCode};
use shuttle_axum::axum::Router;
use tower::ServiceExt as _;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::article;
use landing_feeds::{build_app, FeedsConfig, OnlineFlag};

async fn get_text(app: Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    (status, String::from_utf8(bytes.to_vec()).expect("utf8"))
}

#[tokio::test]
async fn startup_fetch_is_recorded_with_descriptions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/home-landing.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([article("h1", "Home")])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("landing.json");
    let cfg = FeedsConfig::from_toml_str(&format!(
        r#"
[provider]
cache_path = "{cache}"
write_debounce_ms = 50

[fetch]
backoff_base_ms = 10

[[feeds]]
key = "home-landing"
url = "{base}/home-landing.json"
priority = "high"
"#,
        cache = cache.display().to_string().replace('\\', "/"),
        base = server.uri(),
    ))
    .unwrap();

    let app = build_app(&cfg, OnlineFlag::default()).expect("app builds");

    // the startup task runs in the background
    tokio::time::sleep(Duration::from_millis(400)).await;

    let (status, main) = get_text(app.clone(), "/landing/main").await;
    assert_eq!(status, StatusCode::OK);
    assert!(main.contains("\"h1\""), "startup fetch not applied: {main}");

    let (status, text) = get_text(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        text.contains("# HELP feeds_fetch_total"),
        "fetch counter description missing:\n{text}"
    );
    assert!(
        text.contains("feeds_fetch_total 1"),
        "startup fetch not counted:\n{text}"
    );
    assert!(cache.exists());
}
