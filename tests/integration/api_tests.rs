//! API integration tests for the counter endpoint.
//!
//! Tests verify:
//! - `/c.png` records visits and returns a PNG of the count
//! - Domain resolution from Referer and the `d` parameter
//! - Theme and width query parameters
//! - Degraded behaviour when the store fails
//! - Health check and static web root

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use visit_counter::{create_router, EventStore, RedbEventStore, RouterConfig, VisitCounter};

use super::test_utils::{
    decode_png, is_valid_png, read_digits, test_registry, FailingStore, AOMM_TILE, SEGMENT_TILE,
};

fn test_app<S: EventStore>(store: S) -> (Arc<VisitCounter<S>>, Router) {
    let counter = Arc::new(VisitCounter::new(store, test_registry()));
    let router = create_router(Arc::clone(&counter), RouterConfig::new().with_tracing(false));
    (counter, router)
}

fn visit(uri: &str, forwarded_for: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", forwarded_for)
        .body(Body::empty())
        .unwrap()
}

fn visit_count(response: &axum::response::Response) -> u64 {
    response
        .headers()
        .get("x-visit-count")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap()
}

// =============================================================================
// Counter Image
// =============================================================================

#[tokio::test]
async fn test_counter_png_response() {
    let (counter, router) = test_app(RedbEventStore::in_memory().unwrap());

    let response = router
        .oneshot(visit("/c.png?d=example.com", "203.0.113.9"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
    let cache_control = response
        .headers()
        .get("cache-control")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cache_control.contains("no-cache"));
    assert!(cache_control.contains("no-store"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_png(&body), "Response should be a valid PNG");

    let image = decode_png(&body);
    assert_eq!(image.dimensions(), (SEGMENT_TILE.0 * 5, SEGMENT_TILE.1));

    counter.flush().await;
    assert_eq!(counter.count("example.com").await, 1);

    counter.shutdown().await;
}

#[tokio::test]
async fn test_visits_accumulate() {
    let (counter, router) = test_app(RedbEventStore::in_memory().unwrap());

    for n in 0..4 {
        let forwarded = format!("198.51.100.{}", n);
        let response = router
            .clone()
            .oneshot(visit("/c.png?d=blog.example", &forwarded))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    counter.flush().await;

    // An unparseable forwarded address is not recorded but still gets an image.
    let response = router
        .oneshot(visit("/c.png?d=blog.example", "not-an-ip"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(visit_count(&response), 4);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(read_digits(&decode_png(&body), SEGMENT_TILE.0), "00004");

    counter.flush().await;
    assert_eq!(counter.count("blog.example").await, 4);

    counter.shutdown().await;
}

#[tokio::test]
async fn test_referer_takes_precedence() {
    let (counter, router) = test_app(RedbEventStore::in_memory().unwrap());

    let request = Request::builder()
        .uri("/c.png?d=ignored.example")
        .header("referer", "https://news.example.org/articles/1?ref=x")
        .header("x-forwarded-for", "192.0.2.10, 10.0.0.1")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    counter.flush().await;
    assert_eq!(counter.count("news.example.org").await, 1);
    assert_eq!(counter.count("ignored.example").await, 0);

    counter.shutdown().await;
}

#[tokio::test]
async fn test_no_domain_still_renders() {
    let (counter, router) = test_app(RedbEventStore::in_memory().unwrap());

    let response = router
        .oneshot(visit("/c.png", "203.0.113.9"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(visit_count(&response), 0);

    counter.flush().await;
    let sizes = counter.store().shard_sizes().unwrap();
    assert!(sizes.iter().all(|&size| size == 0));

    counter.shutdown().await;
}

// =============================================================================
// Query Parameters
// =============================================================================

#[tokio::test]
async fn test_theme_and_width_parameters() {
    let (counter, router) = test_app(RedbEventStore::in_memory().unwrap());

    let response = router
        .clone()
        .oneshot(visit("/c.png?d=example.com&t=2&w=8", "203.0.113.9"))
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(
        decode_png(&body).dimensions(),
        (AOMM_TILE.0 * 8, AOMM_TILE.1)
    );

    // Malformed values fall back to the defaults.
    let response = router
        .clone()
        .oneshot(visit("/c.png?d=example.com&t=zzz&w=wide", "203.0.113.9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(
        decode_png(&body).dimensions(),
        (SEGMENT_TILE.0 * 5, SEGMENT_TILE.1)
    );

    // Widths are clamped.
    let response = router
        .oneshot(visit("/c.png?d=example.com&w=5000", "203.0.113.9"))
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(decode_png(&body).width(), SEGMENT_TILE.0 * 100);

    counter.shutdown().await;
}

#[tokio::test]
async fn test_repeated_and_garbled_parameters() {
    let (counter, router) = test_app(RedbEventStore::in_memory().unwrap());

    // Repeated keys: the first value wins.
    let response = router
        .clone()
        .oneshot(visit(
            "/c.png?d=dup.example&d=other.example&t=2&t=1&w=3&w=9",
            "203.0.113.9",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(
        decode_png(&body).dimensions(),
        (AOMM_TILE.0 * 3, AOMM_TILE.1)
    );

    // Undecodable escapes and empty values fall back to the defaults.
    let response = router
        .oneshot(visit("/c.png?d=dup.example&t=%ZZ&w&junk", "203.0.113.10"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(
        decode_png(&body).dimensions(),
        (SEGMENT_TILE.0 * 5, SEGMENT_TILE.1)
    );

    counter.flush().await;
    assert_eq!(counter.count("dup.example").await, 2);
    assert_eq!(counter.count("other.example").await, 0);

    counter.shutdown().await;
}

// =============================================================================
// Degraded Store
// =============================================================================

#[tokio::test]
async fn test_failing_store_serves_zero() {
    let (counter, router) = test_app(FailingStore);

    let response = router
        .oneshot(visit("/c.png?d=example.com", "203.0.113.9"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(visit_count(&response), 0);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(read_digits(&decode_png(&body), SEGMENT_TILE.0), "00000");

    counter.shutdown().await;
}

// =============================================================================
// Health and Static Files
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (counter, router) = test_app(RedbEventStore::in_memory().unwrap());

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["pending_writes"], 0);
    assert_eq!(json["written_visits"], 0);
    assert_eq!(json["dropped_visits"], 0);

    counter.shutdown().await;
}

#[tokio::test]
async fn test_static_web_root() {
    let web = tempfile::tempdir().unwrap();
    std::fs::write(web.path().join("index.html"), "<h1>counter</h1>").unwrap();

    let counter = Arc::new(VisitCounter::new(
        RedbEventStore::in_memory().unwrap(),
        test_registry(),
    ));
    let router = create_router(
        Arc::clone(&counter),
        RouterConfig::new().with_web_dir(web.path()),
    );

    let request = Request::builder()
        .uri("/index.html")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"<h1>counter</h1>");

    let request = Request::builder()
        .uri("/missing.html")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    counter.shutdown().await;
}

#[tokio::test]
async fn test_unknown_route_without_web_root() {
    let (counter, router) = test_app(RedbEventStore::in_memory().unwrap());

    let request = Request::builder()
        .uri("/index.html")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    counter.shutdown().await;
}
