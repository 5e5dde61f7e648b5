//! Tests for per-caller rate limiting.

use std::sync::Arc;

use api::{
    router, AppState, Bucket, EventTracker, RateLimit, RateLimitOutcome, RateLimitRejection,
};
use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};
use promotion_store::InMemoryStore;
use rebate_core::RebateCalculator;
use serde_json::{json, Value};

/// The calculator bucket allows 50 requests per minute per caller
#[tokio::test]
async fn test_calculator_bucket_limits_after_50_requests() {
    let promo = fixtures::tiered_cashback();
    let id = promo.id;
    let ctx = TestContext::with_promotions([promo]);
    let server = ctx.server();

    for i in 0..50 {
        let response = server
            .post("/api/promotions/calculate")
            .json(&fixtures::calculate_body(id, 5.0, None))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK, "request {i}");
    }

    let response = server
        .post("/api/promotions/calculate")
        .json(&fixtures::calculate_body(id, 5.0, None))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.header("x-ratelimit-limit"), "50");
    assert_eq!(response.header("x-ratelimit-remaining"), "0");

    let retry_after: u64 = response
        .header("retry-after")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(
        body["error"]["message"],
        format!("Too many requests. Please try again in {retry_after} seconds.")
    );

    // 50 successful calculations, no click for the rejected one
    assert_eq!(ctx.captured_events().len(), 50);
}

/// Limits apply before the body is validated
#[tokio::test]
async fn test_invalid_requests_spend_points() {
    let ctx = TestContext::new();
    let server = ctx.server();

    for _ in 0..50 {
        server
            .post("/api/promotions/calculate")
            .json(&json!({}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    server
        .post("/api/promotions/calculate")
        .json(&json!({}))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

/// Callers identified by x-user-id have independent budgets
#[tokio::test]
async fn test_identities_are_independent() {
    let promo = fixtures::tiered_cashback();
    let id = promo.id;
    let ctx = TestContext::with_promotions([promo]);
    let server = ctx.server();

    for _ in 0..50 {
        server
            .post("/api/promotions/calculate")
            .add_header("x-user-id", "user-a")
            .json(&fixtures::calculate_body(id, 5.0, None))
            .await
            .assert_status_ok();
    }

    server
        .post("/api/promotions/calculate")
        .add_header("x-user-id", "user-a")
        .json(&fixtures::calculate_body(id, 5.0, None))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    server
        .post("/api/promotions/calculate")
        .add_header("x-user-id", "user-b")
        .json(&fixtures::calculate_body(id, 5.0, None))
        .await
        .assert_status_ok();

    // Forwarded IP is a separate identity too
    server
        .post("/api/promotions/calculate")
        .add_header("x-forwarded-for", "192.0.2.10")
        .json(&fixtures::calculate_body(id, 5.0, None))
        .await
        .assert_status_ok();
}

/// Listing uses the general bucket (100 per minute)
#[tokio::test]
async fn test_general_bucket_limits_listing() {
    let ctx = TestContext::new();
    let server = ctx.server();

    for _ in 0..100 {
        server.get("/api/promotions").await.assert_status_ok();
    }

    let response = server.get("/api/promotions").await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.header("x-ratelimit-limit"), "100");

    // Buckets are independent
    server
        .post("/api/promotions/calculate")
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

/// Rejects every request in the calculator bucket.
struct ClosedCalculator;

impl RateLimit for ClosedCalculator {
    fn consume(
        &self,
        bucket: Bucket,
        _identity: &str,
    ) -> Result<RateLimitOutcome, RateLimitRejection> {
        match bucket {
            Bucket::Calculator => Err(RateLimitRejection {
                limit: bucket.points(),
                remaining_points: 0,
                ms_before_next: 30_000,
            }),
            _ => Ok(RateLimitOutcome {
                limit: bucket.points(),
                remaining_points: bucket.points(),
                ms_before_next: 0,
            }),
        }
    }
}

/// The limiter is injected through AppState
#[tokio::test]
async fn test_custom_rate_limiter() {
    let (tracker, _rx) = EventTracker::channel(16);
    let state = AppState::new(
        Arc::new(InMemoryStore::new()),
        tracker,
        RebateCalculator::default(),
    )
    .with_rate_limiter(Arc::new(ClosedCalculator));
    let server = TestServer::new(router(state)).expect("Failed to create test server");

    let response = server
        .post("/api/promotions/calculate")
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.header("retry-after"), "30");

    server.get("/api/promotions").await.assert_status_ok();
}
