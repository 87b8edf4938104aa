use super::*;
use crate::downloader::test_helpers::{FakeEngine, Script};
use crate::engine::FetchEngine;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;


/// Helper to create a test MediaDownloader wrapped in Arc
async fn create_test_downloader(
    engine: Arc<dyn FetchEngine>,
) -> (Arc<MediaDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) =
        crate::downloader::test_helpers::create_test_downloader(engine).await;
    (Arc::new(downloader), temp_dir)
}

/// Router over a downloader whose engine follows `script`
async fn test_app(script: Script) -> (Router, Arc<MediaDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) = create_test_downloader(Arc::new(FakeEngine::new(script))).await;
    let app = create_router(downloader.clone(), downloader.get_config());
    (app, downloader, temp_dir)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns_and_stops_on_shutdown() {
    let (downloader, _temp_dir) =
        create_test_downloader(Arc::new(FakeEngine::new(Script::succeed("mp4", "x")))).await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let downloader = downloader.clone();
        let config = config.clone();
        async move { start_api_server(downloader, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    downloader.shutdown().await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), api_handle)
        .await
        .expect("server should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_api_server_bind_conflict_is_io_error() {
    let (downloader, _temp_dir) =
        create_test_downloader(Arc::new(FakeEngine::new(Script::succeed("mp4", "x")))).await;

    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = (*downloader.get_config()).clone();
    config.server.api.bind_address = occupied.local_addr().unwrap();

    let err = start_api_server(downloader, Arc::new(config))
        .await
        .unwrap_err();
    assert!(matches!(err, crate::Error::Io(_)));
}

#[tokio::test]
async fn test_cors_enabled() {
    let (downloader, _temp_dir) =
        create_test_downloader(Arc::new(FakeEngine::new(Script::succeed("mp4", "x")))).await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (downloader, _temp_dir) =
        create_test_downloader(Arc::new(FakeEngine::new(Script::succeed("mp4", "x")))).await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (downloader, _temp_dir) =
        create_test_downloader(Arc::new(FakeEngine::new(Script::succeed("mp4", "x")))).await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_origins = vec!["http://allowed.example".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://allowed.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://allowed.example"
    );
}

#[tokio::test]
async fn test_swagger_ui_only_when_enabled() {
    let (downloader, _temp_dir) =
        create_test_downloader(Arc::new(FakeEngine::new(Script::succeed("mp4", "x")))).await;

    let app = create_router(downloader.clone(), downloader.get_config());
    let response = app.oneshot(get("/swagger-ui/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let mut config = (*downloader.get_config()).clone();
    config.server.api.swagger_ui = true;
    let app = create_router(downloader, Arc::new(config));
    let response = app.oneshot(get("/api-docs/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _downloader, _temp_dir) = test_app(Script::succeed("mp4", "x")).await;
    let response = app.oneshot(get("/api/nothing-here")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
