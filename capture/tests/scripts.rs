use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

#[path = "common/utils.rs"]
mod test_utils;
use test_utils::*;

use edge_capture::dispatch::Dispatcher;

fn app() -> axum::Router {
    test_router(Dispatcher::new(MemorySink::default()), StubStore::default())
}

async fn fetch_script(uri: &str) -> (StatusCode, String, String) {
    let request = Request::builder()
        .uri(uri)
        .header("host", "edge.example.com")
        .header("x-forwarded-proto", "https")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response.headers()["content-type"]
        .to_str()
        .unwrap()
        .to_string();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn page_view_script_points_back_at_the_service() {
    let (status, content_type, script) = fetch_script("/js").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "application/javascript");
    assert!(script.contains(r#"fetch("https://edge.example.com/track""#));
}

#[tokio::test]
async fn each_recorder_script_gets_a_fresh_id() {
    let (status, content_type, first) = fetch_script("/record.js").await;
    let (_, _, second) = fetch_script("/record.js").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "application/javascript");
    assert!(first.contains(r#"fetch("https://edge.example.com/save-recording""#));
    assert_ne!(first, second);
}

#[tokio::test]
async fn service_routes_answer() {
    for (uri, expected) in [("/", "edge-capture"), ("/_readiness", "ok"), ("/_liveness", "ok")] {
        let (status, body) = call(app(), get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, expected);
    }

    // Only mounted when the exporter is enabled
    let (status, _) = call(app(), get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cross_origin_requests_are_allowed() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/track")
        .header("origin", "https://blog.example.org")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        response.headers()["access-control-allow-headers"],
        "content-type"
    );
}
