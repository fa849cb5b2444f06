//! API integration tests for tile retrieval and error handling.
//!
//! Tests verify:
//! - Cache miss then hit through the router, with response headers
//! - Default and named providers, including unknown providers
//! - Error cases (bad coordinates, unknown format, upstream failures)
//! - Providers listing, health, base path and CORS

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use osm_cache::RouterConfig;

use super::test_utils::{
    test_router, test_router_with_config, MockFetcher, MockResponse, TILE_BYTES,
};

async fn get(router: &Router, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Tile Retrieval
// =============================================================================

#[tokio::test]
async fn test_tile_miss_then_hit() {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let router = test_router(tmp.path(), fetcher.clone());

    let response = get(&router, "/3/1/2.png").await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers.get("content-type").unwrap(), "image/png");
    assert_eq!(
        headers.get("content-disposition").unwrap(),
        "inline; filename=\"2.png\""
    );
    assert_eq!(
        headers.get("cache-control").unwrap(),
        "public, max-age=86400"
    );
    assert_eq!(headers.get("x-tile-cache-hit").unwrap(), "false");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], TILE_BYTES);

    // Stored under the default provider's directory
    let path = tmp.path().join("osm").join("3").join("1").join("2.png");
    assert_eq!(std::fs::read(&path).unwrap(), TILE_BYTES);
    assert_eq!(fetcher.urls(), vec!["https://osm.test/3/1/2.png"]);

    // Second request is served from disk
    let response = get(&router, "/3/1/2.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-tile-cache-hit").unwrap(), "true");
    assert_eq!(fetcher.call_count(), 1);
}

#[tokio::test]
async fn test_jpg_tile() {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let router = test_router(tmp.path(), fetcher.clone());

    let response = get(&router, "/4/5/6.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/jpeg");
    assert_eq!(
        response.headers().get("content-disposition").unwrap(),
        "inline; filename=\"6.jpg\""
    );

    assert!(tmp.path().join("osm/4/5/6.jpg").exists());
    assert!(!tmp.path().join("osm/4/5/6.png").exists());
    assert_eq!(fetcher.urls(), vec!["https://osm.test/4/5/6.jpg"]);
}

#[tokio::test]
async fn test_cached_file_served_without_upstream() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("osm").join("0").join("0");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("0.png"), [7, 7, 7]).unwrap();

    let fetcher = Arc::new(MockFetcher::with_response(MockResponse::NotFound));
    let router = test_router(tmp.path(), fetcher.clone());

    let response = get(&router, "/0/0/0.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-tile-cache-hit").unwrap(), "true");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], &[7, 7, 7]);
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_named_provider() {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let router = test_router(tmp.path(), fetcher.clone());

    let response = get(&router, "/topo/3/1/2.png").await;
    assert_eq!(response.status(), StatusCode::OK);

    assert!(tmp.path().join("topo/3/1/2.png").exists());
    assert!(!tmp.path().join("osm/3/1/2.png").exists());
    assert_eq!(fetcher.urls(), vec!["https://topo.test/3/1/2.png"]);

    // The default provider has its own namespace, so this is a miss
    let response = get(&router, "/3/1/2.png").await;
    assert_eq!(response.headers().get("x-tile-cache-hit").unwrap(), "false");
    assert_eq!(fetcher.call_count(), 2);
}

#[tokio::test]
async fn test_unknown_provider() {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let router = test_router(tmp.path(), fetcher.clone());

    let response = get(&router, "/nope/3/1/2.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"], "provider_not_found");
    assert_eq!(json["status"], 404);
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_concurrent_misses_share_one_fetch() {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_millis(50)));
    let router = test_router(tmp.path(), fetcher.clone());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            let request = Request::builder()
                .uri("/5/10/12.png")
                .body(Body::empty())
                .unwrap();
            let response = router.oneshot(request).await.unwrap();
            let status = response.status();
            let body = response.into_body().collect().await.unwrap().to_bytes();
            (status, body)
        }));
    }

    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], TILE_BYTES);
    }

    assert_eq!(fetcher.call_count(), 1);
    assert!(tmp.path().join("osm/5/10/12.png").exists());
}

#[tokio::test]
async fn test_query_string_not_forwarded() {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let router = test_router(tmp.path(), fetcher.clone());

    let response = get(&router, "/3/1/2.png?style=dark").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fetcher.urls(), vec!["https://osm.test/3/1/2.png"]);
}

// =============================================================================
// Error Handling
// =============================================================================

#[tokio::test]
async fn test_invalid_tile_requests() {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let router = test_router(tmp.path(), fetcher.clone());

    for uri in [
        "/a/1/2.png",
        "/3/x/2.png",
        "/3/1/y.png",
        "/3/1/2",
        "/3/1/2.gif",
        "/3/8/2.png",
        "/3/1/8.png",
        "/31/0/0.png",
        "/topo/3/1/2.webp",
    ] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri {}", uri);

        let json = body_json(response).await;
        assert_eq!(json["error"], "invalid_input", "uri {}", uri);
    }

    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_wrong_segment_count_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let router = test_router(tmp.path(), fetcher.clone());

    for uri in ["/3/1", "/a/b/3/1/2.png", "/favicon.ico"] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {}", uri);
    }

    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_upstream_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::with_response(MockResponse::NotFound));
    let router = test_router(tmp.path(), fetcher.clone());

    let response = get(&router, "/3/1/2.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"], "not_found");

    // Nothing cached; the next request asks upstream again
    assert!(!tmp.path().join("osm/3/1/2.png").exists());
    let _ = get(&router, "/3/1/2.png").await;
    assert_eq!(fetcher.call_count(), 2);
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::with_response(MockResponse::Status(
        500,
        "boom".to_string(),
    )));
    let router = test_router(tmp.path(), fetcher.clone());

    let response = get(&router, "/3/1/2.png").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let json = body_json(response).await;
    assert_eq!(json["error"], "upstream_error");
    assert!(json["message"].as_str().unwrap().contains("boom"));
    assert!(!tmp.path().join("osm/3/1/2.png").exists());
}

#[tokio::test]
async fn test_upstream_transport_error_is_bad_gateway() {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::with_response(MockResponse::Transport(
        "connection refused".to_string(),
    )));
    let router = test_router(tmp.path(), fetcher.clone());

    let response = get(&router, "/3/1/2.png").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

// =============================================================================
// Providers, Health, Seed
// =============================================================================

#[tokio::test]
async fn test_providers_endpoint() {
    let tmp = tempfile::tempdir().unwrap();
    let router = test_router(tmp.path(), Arc::new(MockFetcher::new()));

    let response = get(&router, "/providers").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(
        json,
        serde_json::json!({
            "default": "osm",
            "providers": [
                { "name": "osm", "attribution": "© OpenStreetMap contributors" },
                { "name": "topo" }
            ]
        })
    );
}

#[tokio::test]
async fn test_health_endpoint() {
    let tmp = tempfile::tempdir().unwrap();
    let router = test_router(tmp.path(), Arc::new(MockFetcher::new()));

    let response = get(&router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_seed_endpoint() {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let router = test_router(tmp.path(), fetcher.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/seed?provider=topo&topLat=1&topLon=-1&bottomLat=-1&bottomLon=1&zoom=1")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["written"].as_array().unwrap().len(), 4);
    assert_eq!(json["skipped"], 0);
    assert_eq!(json["failed"], 0);

    for (x, y) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
        let path = tmp.path().join(format!("topo/1/{}/{}.png", x, y));
        assert!(path.exists(), "{} missing", path.display());
    }

    // Seeded tiles are now cache hits
    let response = get(&router, "/topo/1/0/0.png").await;
    assert_eq!(response.headers().get("x-tile-cache-hit").unwrap(), "true");
    assert_eq!(fetcher.call_count(), 4);
}

#[tokio::test]
async fn test_seed_rejects_large_area() {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let router = test_router(tmp.path(), fetcher.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/seed?topLat=60&topLon=-30&bottomLat=30&bottomLon=30&zoom=10&format=jpg")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "too_many_tiles");
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_seed_unknown_provider() {
    let tmp = tempfile::tempdir().unwrap();
    let router = test_router(tmp.path(), Arc::new(MockFetcher::new()));

    let request = Request::builder()
        .method("POST")
        .uri("/seed?provider=nope&topLat=1&topLon=-1&bottomLat=-1&bottomLon=1&zoom=1")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Base Path and CORS
// =============================================================================

#[tokio::test]
async fn test_base_path() {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let router = test_router_with_config(
        tmp.path(),
        fetcher.clone(),
        RouterConfig::new().with_base_path("/maps/").with_tracing(false),
    );

    let response = get(&router, "/maps/3/1/2.png").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&router, "/maps/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&router, "/health").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(fetcher.call_count(), 1);
}

#[tokio::test]
async fn test_cors_allowed_origin() {
    let tmp = tempfile::tempdir().unwrap();
    let router = test_router_with_config(
        tmp.path(),
        Arc::new(MockFetcher::new()),
        RouterConfig::new()
            .with_cors_origins(vec!["http://localhost:8000".to_string()])
            .with_tracing(false),
    );

    let request = Request::builder()
        .uri("/health")
        .header("origin", "http://localhost:8000")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://localhost:8000"
    );

    let request = Request::builder()
        .uri("/health")
        .header("origin", "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}
