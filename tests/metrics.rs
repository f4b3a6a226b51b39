// tests/metrics.rs
//
// Installs the global Prometheus recorder once, drives a fetch and checks the
// exposition served on /metrics.

mod common;

use serde_json::json;
use shuttle_axum::axum::body::{self, Body};
use shuttle_axum::axum::http::{Request, StatusCode};
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{article, feed, fetcher};
use landing_feeds::feeds::{OnlineFlag, Priority};
use landing_feeds::metrics::Metrics;

#[tokio::test]
async fn metrics_endpoint_exposes_feed_series() {
    let metrics = Metrics::init().expect("recorder installs once per test binary");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([
                article("1", "A"),
                { "id": "2", "title": "no thumb" }
            ])),
        )
        .mount(&server)
        .await;

    let online = OnlineFlag::default();
    let desc = feed("home-landing", &server.uri(), Priority::High);
    let result = fetcher(&online).fetch_with_retry(&desc).await.expect("fetch");
    let shown = landing_feeds::feeds::validate::filter_items(&result.items);
    assert_eq!(shown.len(), 1);

    let req = Request::builder()
        .method("GET")
        .uri("/metrics")
        .body(Body::empty())
        .expect("build GET /metrics");
    let resp = metrics.router().oneshot(req).await.expect("oneshot /metrics");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    let text = String::from_utf8(bytes.to_vec()).expect("utf8");

    assert!(text.contains("feeds_fetch_total"), "missing fetch counter:\n{text}");
    assert!(text.contains("feeds_fetch_ms"), "missing latency histogram:\n{text}");
    assert!(
        text.contains("feeds_items_dropped_total"),
        "missing dropped counter:\n{text}"
    );
}
