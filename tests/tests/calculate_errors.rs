//! Tests for error handling in the calculate endpoint.
//!
//! Every failure must use the `{ error: { code, message, timestamp } }` envelope.

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use integration_tests::{fixtures, setup::TestContext};
use serde_json::{json, Value};
use uuid::Uuid;

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or("")
}

/// Account type outside the allow-list returns INVALID_ACCOUNT_TYPE
#[tokio::test]
async fn test_invalid_account_type_returns_400() {
    let promo = fixtures::tiered_cashback();
    let id = promo.id;
    let ctx = TestContext::with_promotions([promo]);
    let server = ctx.server();

    let response = server
        .post("/api/promotions/calculate")
        .json(&fixtures::calculate_body(id, 50.0, Some("VIP")))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(error_code(&body), "INVALID_ACCOUNT_TYPE");
    assert_eq!(
        body["error"]["message"],
        "Account type 'VIP' is not eligible for this promotion. Valid types: Standard, ECN"
    );
    assert!(body["error"]["timestamp"].is_string());
}

/// Unknown promotion returns 404
#[tokio::test]
async fn test_unknown_promotion_returns_404() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/promotions/calculate")
        .json(&fixtures::calculate_body(Uuid::new_v4(), 5.0, None))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(error_code(&body), "PROMOTION_NOT_FOUND");
}

/// Malformed input returns VALIDATION_ERROR with the specific message
#[tokio::test]
async fn test_validation_errors() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let valid_id = Uuid::new_v4().to_string();

    let cases = [
        (json!({ "monthlyVolume": 5 }), "Promotion ID is required and must be a string"),
        (
            json!({ "promotionId": "promo-1", "monthlyVolume": 5 }),
            "Invalid promotion ID format",
        ),
        (json!({ "promotionId": valid_id }), "Monthly volume is required"),
        (
            json!({ "promotionId": valid_id, "monthlyVolume": -1 }),
            "Monthly volume must be a non-negative number",
        ),
        (
            json!({ "promotionId": valid_id, "monthlyVolume": "lots" }),
            "Monthly volume must be a non-negative number",
        ),
        (
            json!({ "promotionId": valid_id, "monthlyVolume": 1_000_001 }),
            "Monthly volume exceeds maximum allowed value (1,000,000 lots)",
        ),
        (
            json!({ "promotionId": valid_id, "monthlyVolume": 5, "accountType": " " }),
            "Account type must be a non-empty string if provided",
        ),
    ];

    for (payload, message) in cases {
        let response = server.post("/api/promotions/calculate").json(&payload).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(error_code(&body), "VALIDATION_ERROR", "payload {payload}");
        assert_eq!(body["error"]["message"], message, "payload {payload}");
    }
}

/// Unparsable JSON returns VALIDATION_ERROR
#[tokio::test]
async fn test_invalid_json_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/promotions/calculate")
        .text("{not json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Invalid JSON in request body");
}

/// Inactive wins over every other rule
#[tokio::test]
async fn test_inactive_promotion_checked_first() {
    let mut promo = fixtures::tiered_cashback();
    promo.is_active = false;
    promo.end_date = Some(Utc::now() - Duration::days(1));
    let id = promo.id;
    let ctx = TestContext::with_promotions([promo]);
    let server = ctx.server();

    let response = server
        .post("/api/promotions/calculate")
        .json(&fixtures::calculate_body(id, 500.0, Some("VIP")))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(error_code(&body), "PROMOTION_INACTIVE");
}

/// Expired promotion returns PROMOTION_EXPIRED on calculate (400, not 410)
#[tokio::test]
async fn test_expired_promotion_returns_400() {
    let mut promo = fixtures::tiered_cashback();
    promo.end_date = Some(Utc::now() - Duration::hours(1));
    let id = promo.id;
    let ctx = TestContext::with_promotions([promo]);
    let server = ctx.server();

    let response = server
        .post("/api/promotions/calculate")
        .json(&fixtures::calculate_body(id, 50.0, None))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(error_code(&body), "PROMOTION_EXPIRED");
}

/// Promotion without tiers returns NO_RATES_AVAILABLE
#[tokio::test]
async fn test_no_rates_returns_400() {
    let promo = fixtures::promotion(rebate_core::PromotionType::CommissionDiscount);
    let id = promo.id;
    let ctx = TestContext::with_promotions([promo]);
    let server = ctx.server();

    let response = server
        .post("/api/promotions/calculate")
        .json(&fixtures::calculate_body(id, 50.0, None))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(error_code(&body), "NO_RATES_AVAILABLE");
}

/// Volume below the minimum returns INSUFFICIENT_VOLUME
#[tokio::test]
async fn test_insufficient_volume_returns_400() {
    let promo = fixtures::tiered_cashback();
    let id = promo.id;
    let ctx = TestContext::with_promotions([promo]);
    let server = ctx.server();

    let response = server
        .post("/api/promotions/calculate")
        .json(&fixtures::calculate_body(id, 0.5, None))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(error_code(&body), "INSUFFICIENT_VOLUME");
    assert_eq!(body["error"]["message"], "Minimum trading volume of 1 lots required");
}

/// Volume above every bounded tier returns NO_APPLICABLE_RATE
#[tokio::test]
async fn test_no_applicable_rate_returns_400() {
    let promo = fixtures::tiered_cashback();
    let id = promo.id;
    let ctx = TestContext::with_promotions([promo]);
    let server = ctx.server();

    let response = server
        .post("/api/promotions/calculate")
        .json(&fixtures::calculate_body(id, 150.0, None))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(error_code(&body), "NO_APPLICABLE_RATE");
    assert_eq!(
        body["error"]["message"],
        "No rate tier found for the specified volume"
    );
}

/// Store failures return a generic 500 with details outside production
#[tokio::test]
async fn test_store_failure_returns_500_with_details() {
    let promo = fixtures::tiered_cashback();
    let id = promo.id;
    let ctx = TestContext::with_promotions([promo]);
    ctx.set_lookup_failure(true);
    let server = ctx.server();

    let response = server
        .post("/api/promotions/calculate")
        .json(&fixtures::calculate_body(id, 50.0, None))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(error_code(&body), "INTERNAL_SERVER_ERROR");
    assert_eq!(body["error"]["message"], "An unexpected error occurred");
    assert!(body["error"]["details"]
        .as_str()
        .unwrap_or("")
        .contains("Mock lookup failure"));
}

/// Production hides internal error details
#[tokio::test]
async fn test_store_failure_hides_details_in_production() {
    let promo = fixtures::tiered_cashback();
    let id = promo.id;
    let ctx = TestContext::production([promo]);
    ctx.set_lookup_failure(true);
    let server = ctx.server();

    let response = server
        .post("/api/promotions/calculate")
        .json(&fixtures::calculate_body(id, 50.0, None))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body["error"].get("details").is_none());
}

/// Wrong verb returns METHOD_NOT_ALLOWED
#[tokio::test]
async fn test_wrong_method_returns_405() {
    let ctx = TestContext::new();
    let server = ctx.server();

    for method in [Method::GET, Method::PUT, Method::DELETE] {
        let response = server
            .method(method.clone(), "/api/promotions/calculate")
            .await;

        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
        let body: Value = response.json();
        assert_eq!(error_code(&body), "METHOD_NOT_ALLOWED", "method {method}");
    }
}

/// OPTIONS answers 200 with CORS headers for an allowed origin
#[tokio::test]
async fn test_options_returns_cors_headers() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .method(Method::OPTIONS, "/api/promotions/calculate")
        .add_header("origin", "http://localhost:5173")
        .add_header("access-control-request-method", "POST")
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header("access-control-allow-origin"),
        "http://localhost:5173"
    );
}
