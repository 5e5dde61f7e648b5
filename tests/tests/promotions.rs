//! Tests for the promotion listing, detail, and stats endpoints.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use integration_tests::{fixtures, setup::TestContext};
use rebate_core::{EventKind, PromotionType};
use serde_json::Value;
use uuid::Uuid;

#[tokio::test]
async fn test_list_returns_page_with_facets() {
    let mut featured = fixtures::tiered_cashback();
    featured.is_featured = true;
    let mut inactive = fixtures::promotion(PromotionType::DepositBonus);
    inactive.is_active = false;
    let ctx = TestContext::with_promotions([
        featured,
        fixtures::tiered(PromotionType::CommissionDiscount),
        inactive,
    ]);
    let server = ctx.server();

    let response = server.get("/api/promotions").await;

    response.assert_status_ok();
    assert_eq!(
        response.header("cache-control"),
        "public, max-age=300, s-maxage=600"
    );

    let body: Value = response.json();
    assert_eq!(body["totalCount"], 3);
    assert_eq!(body["promotions"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["hasMore"], false);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 20);

    // Facets only count active promotions
    let types = body["filters"]["promotionTypes"].as_array().cloned().unwrap_or_default();
    assert_eq!(types.len(), 2);
    assert!(types.iter().all(|t| t["count"] == 1));
    assert!(types.iter().all(|t| t["type"] != "deposit_bonus"));
}

#[tokio::test]
async fn test_list_filters() {
    let mut featured = fixtures::tiered_cashback();
    featured.is_featured = true;
    let featured_id = featured.id;
    let mut inactive = fixtures::tiered_cashback();
    inactive.is_active = false;
    let ctx = TestContext::with_promotions([
        featured,
        inactive,
        fixtures::tiered(PromotionType::CopyTrading),
    ]);
    let server = ctx.server();

    let response = server
        .get("/api/promotions?promotionTypes[]=cashback&isActive=true")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["totalCount"], 1);
    assert_eq!(body["promotions"][0]["id"], featured_id.to_string());

    let response = server.get("/api/promotions?isFeatured=true").await;
    let body: Value = response.json();
    assert_eq!(body["totalCount"], 1);

    // Best tier pays $8/lot
    let response = server.get("/api/promotions?minRebate=10").await;
    let body: Value = response.json();
    assert_eq!(body["totalCount"], 0);

    let response = server.get("/api/promotions?accountTypes=ecn&maxRebate=8").await;
    let body: Value = response.json();
    assert_eq!(body["totalCount"], 3);
}

#[tokio::test]
async fn test_list_pagination() {
    let ctx = TestContext::with_promotions(
        (0..5).map(|_| fixtures::tiered_cashback()).collect::<Vec<_>>(),
    );
    let server = ctx.server();

    let response = server.get("/api/promotions?page=2&limit=2").await;
    let body: Value = response.json();
    assert_eq!(body["totalCount"], 5);
    assert_eq!(body["promotions"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["hasMore"], true);
    assert_eq!(body["pagination"]["totalPages"], 3);

    let response = server.get("/api/promotions?page=3&limit=2").await;
    let body: Value = response.json();
    assert_eq!(body["promotions"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["hasMore"], false);

    // Oversized limits are clamped
    let response = server.get("/api/promotions?limit=5000").await;
    let body: Value = response.json();
    assert_eq!(body["pagination"]["limit"], 100);
}

#[tokio::test]
async fn test_list_huge_page_returns_empty() {
    let ctx = TestContext::with_promotions([fixtures::tiered_cashback()]);
    let server = ctx.server();

    let response = server
        .get("/api/promotions?page=1000000000000000000&limit=100")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["promotions"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["totalCount"], 1);
    assert_eq!(body["hasMore"], false);
}

#[tokio::test]
async fn test_list_sorting() {
    let mut older = fixtures::tiered_cashback();
    older.created_at = Utc::now() - Duration::days(10);
    let mut newer = fixtures::tiered_cashback();
    newer.created_at = Utc::now() - Duration::days(1);
    let newer_id = newer.id;
    let older_id = older.id;
    let ctx = TestContext::with_promotions([older, newer]);
    let server = ctx.server();

    let body: Value = server
        .get("/api/promotions?sortBy=newest")
        .await
        .json();
    assert_eq!(body["promotions"][0]["id"], newer_id.to_string());

    let body: Value = server
        .get("/api/promotions?sortBy=created_at&sortOrder=asc")
        .await
        .json();
    assert_eq!(body["promotions"][0]["id"], older_id.to_string());
}

#[tokio::test]
async fn test_detail_returns_promotion_and_tracks_view() {
    let promo = fixtures::tiered_cashback();
    let id = promo.id;
    let ctx = TestContext::with_promotions([promo]);
    let server = ctx.server();

    let response = server
        .get(&format!("/api/promotions/{id}"))
        .add_header("user-agent", "integration-test")
        .add_header("referer", "https://example.com/offers")
        .add_header("x-real-ip", "198.51.100.4")
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header("cache-control"),
        "public, max-age=600, s-maxage=1200"
    );
    let body: Value = response.json();
    assert_eq!(body["id"], id.to_string());
    assert_eq!(body["rates"].as_array().map(Vec::len), Some(2));

    let events = ctx.captured_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::View);
    assert_eq!(events[0].metadata["userAgent"], "integration-test");
    assert_eq!(events[0].metadata["referer"], "https://example.com/offers");
    assert_eq!(events[0].metadata["ip"], "198.51.100.4");
}

#[tokio::test]
async fn test_detail_gone_for_inactive_and_expired() {
    let mut inactive = fixtures::tiered_cashback();
    inactive.is_active = false;
    let inactive_id = inactive.id;
    let mut expired = fixtures::tiered_cashback();
    expired.end_date = Some(Utc::now() - Duration::minutes(5));
    let expired_id = expired.id;
    let ctx = TestContext::with_promotions([inactive, expired]);
    let server = ctx.server();

    let response = server.get(&format!("/api/promotions/{inactive_id}")).await;
    response.assert_status(StatusCode::GONE);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "PROMOTION_INACTIVE");

    let response = server.get(&format!("/api/promotions/{expired_id}")).await;
    response.assert_status(StatusCode::GONE);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "PROMOTION_EXPIRED");

    assert!(ctx.captured_events().is_empty());
}

#[tokio::test]
async fn test_detail_not_found_and_malformed_id() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .get(&format!("/api/promotions/{}", Uuid::new_v4()))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "PROMOTION_NOT_FOUND");

    let response = server.get("/api/promotions/not-a-uuid").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Invalid promotion ID format");
}

#[tokio::test]
async fn test_stats_reflect_tracked_events() {
    let promo = fixtures::tiered_cashback();
    let id = promo.id;
    let ctx = TestContext::with_promotions([promo]);
    let server = ctx.server();

    for _ in 0..4 {
        server
            .get(&format!("/api/promotions/{id}"))
            .await
            .assert_status_ok();
    }
    server
        .post("/api/promotions/calculate")
        .json(&fixtures::calculate_body(id, 20.0, None))
        .await
        .assert_status_ok();

    let processed = ctx.process_captured_events().await.expect("Failed to record events");
    assert_eq!(processed, 5);

    let response = server.get(&format!("/api/promotions/{id}/stats")).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["promotionId"], id.to_string());
    assert_eq!(body["totalViews"], 4);
    assert_eq!(body["totalClicks"], 1);
    assert_eq!(body["totalConversions"], 0);
    assert_eq!(body["clickThroughRate"], 25.0);
    assert!(body["daysActive"].as_i64().unwrap_or(0) >= 30);
}

#[tokio::test]
async fn test_stats_unknown_promotion_returns_404() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .get(&format!("/api/promotions/{}/stats", Uuid::new_v4()))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}
