//! Provider tests against a real HTTP upstream.
//!
//! These go through `HttpFetcher` and a stub axum server bound to
//! 127.0.0.1, so URL templating, status mapping and the disk layout are
//! exercised together.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use osm_cache::error::{FetchError, TileError};
use osm_cache::tile::{Provider, ProviderConfig, ProviderRegistry, TileFormat};
use osm_cache::upstream::{HttpFetcher, DEFAULT_UPSTREAM_TIMEOUT};
use osm_cache::{create_router, RouterConfig};

use super::test_utils::{StubUpstream, TILE_BYTES};

fn http_provider(upstream: &StubUpstream, dir: &std::path::Path) -> Provider<HttpFetcher> {
    let fetcher = Arc::new(HttpFetcher::new(DEFAULT_UPSTREAM_TIMEOUT).unwrap());
    Provider::new(
        ProviderConfig::new("stub", upstream.template(), dir),
        fetcher,
    )
}

#[tokio::test]
async fn test_get_tile_downloads_and_persists() {
    let upstream = StubUpstream::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let provider = http_provider(&upstream, tmp.path());

    let tile = provider.get_tile(1, 2, 3, TileFormat::Png).await.unwrap();

    assert_eq!((tile.x, tile.y, tile.z), (1, 2, 3));
    assert_eq!(&tile.bytes[..], TILE_BYTES);

    let path = tmp.path().join("3").join("1").join("2.png");
    assert_eq!(std::fs::read(&path).unwrap(), TILE_BYTES);
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_second_get_is_served_from_disk() {
    let upstream = StubUpstream::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let provider = http_provider(&upstream, tmp.path());

    provider.get_tile(1, 2, 3, TileFormat::Png).await.unwrap();
    let response = provider
        .lookup(1, 2, 3, TileFormat::Png, &[])
        .await
        .unwrap();

    assert!(response.cache_hit);
    assert_eq!(&response.tile.bytes[..], TILE_BYTES);
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_upstream_404_is_tile_not_found() {
    let upstream = StubUpstream::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let provider = http_provider(&upstream, tmp.path());

    let result = provider.get_tile(0, 0, 9, TileFormat::Png).await;

    assert!(matches!(
        result,
        Err(TileError::TileNotFound { z: 9, x: 0, y: 0 })
    ));
    assert!(!tmp.path().join("9").join("0").join("0.png").exists());
}

#[tokio::test]
async fn test_upstream_500_carries_body() {
    let upstream = StubUpstream::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let provider = http_provider(&upstream, tmp.path());

    match provider.get_tile(0, 0, 10, TileFormat::Png).await {
        Err(TileError::Upstream(FetchError::Status { status, body })) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("Expected upstream status error, got {:?}", other),
    }
    assert!(!tmp.path().join("10").exists());
}

#[tokio::test]
async fn test_unreachable_upstream_is_transport_error() {
    // Bind then drop a listener so the port is closed
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(HttpFetcher::new(DEFAULT_UPSTREAM_TIMEOUT).unwrap());
    let provider = Provider::new(
        ProviderConfig::new(
            "closed",
            format!("http://{}/{{z}}/{{x}}/{{y}}.png", addr),
            tmp.path(),
        ),
        fetcher,
    );

    let result = provider.get_tile(0, 0, 0, TileFormat::Png).await;
    assert!(matches!(
        result,
        Err(TileError::Upstream(FetchError::Transport(_)))
    ));
}

#[tokio::test]
async fn test_router_end_to_end() {
    let upstream = StubUpstream::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(HttpFetcher::new(DEFAULT_UPSTREAM_TIMEOUT).unwrap());
    let registry = ProviderRegistry::new(
        vec![ProviderConfig::new(
            "stub",
            upstream.template(),
            tmp.path().join("stub"),
        )],
        None,
        fetcher,
    )
    .unwrap();
    let router = create_router(
        Arc::new(registry),
        RouterConfig::new().with_tracing(false),
    );

    for (uri, expected_hit) in [("/3/1/2.jpg", "false"), ("/stub/3/1/2.jpg", "true")] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("content-type").unwrap(), "image/jpeg");
        assert_eq!(
            response.headers().get("x-tile-cache-hit").unwrap(),
            expected_hit
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], TILE_BYTES);
    }

    let request = Request::builder()
        .uri("/3/1/4.png")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .uri("/10/0/0.png")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    assert!(tmp.path().join("stub/3/1/2.jpg").exists());
    assert_eq!(upstream.hits(), 3);
}
