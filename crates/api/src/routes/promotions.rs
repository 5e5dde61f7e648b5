//! Promotion catalogue endpoints.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use rebate_core::{parse_promotion_id, EventKind, PromotionErrorCode, PromotionQuery, TrackingEvent};
use serde_json::json;
use std::time::Instant;
use telemetry::metrics;
use tracing::debug;

use crate::extractors::ClientIdentity;
use crate::middleware::rate_limit::Bucket;
use crate::response::ApiError;
use crate::routes::{cache_control, DETAIL_CACHE_CONTROL, LIST_CACHE_CONTROL};
use crate::state::AppState;

/// GET /api/promotions - Filtered, sorted, paginated listing.
pub async fn list_handler(
    State(state): State<AppState>,
    identity: ClientIdentity,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, ApiError> {
    let start = Instant::now();
    metrics().requests_received.inc();

    state.check_rate_limit(Bucket::General, &identity.key)?;

    let Query(pairs) = query.map_err(|e| {
        metrics().validation_failures.inc();
        ApiError::validation(format!("Invalid query string: {}", e.body_text()))
    })?;
    let query = PromotionQuery::from_pairs(pairs);

    let page = state
        .store
        .list_promotions(&query)
        .await
        .map_err(|e| state.error(e))?;

    metrics().promotions_listed.inc();
    metrics()
        .list_latency_ms
        .observe(start.elapsed().as_millis() as u64);

    debug!(
        total = page.total_count,
        returned = page.promotions.len(),
        "Promotions listed"
    );

    Ok((cache_control(LIST_CACHE_CONTROL), Json(page)).into_response())
}

/// GET /api/promotions/:id - Single promotion, 410 once it is no longer offered.
pub async fn detail_handler(
    State(state): State<AppState>,
    identity: ClientIdentity,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    metrics().requests_received.inc();

    state.check_rate_limit(Bucket::General, &identity.key)?;

    let id = parse_promotion_id(&raw_id).map_err(|e| {
        metrics().validation_failures.inc();
        ApiError::from(e)
    })?;

    let promotion = state
        .store
        .get_promotion_by_id(&id)
        .await
        .map_err(|e| state.error(e))?
        .ok_or_else(|| ApiError::from(rebate_core::Error::not_found("Promotion not found")))?;

    if !promotion.is_active {
        return Err(ApiError::gone(
            PromotionErrorCode::Inactive,
            "Promotion is no longer active",
        ));
    }
    if promotion.is_expired_at(Utc::now()) {
        return Err(ApiError::gone(
            PromotionErrorCode::Expired,
            "Promotion has expired",
        ));
    }

    state.tracker.track(TrackingEvent::new(
        id,
        EventKind::View,
        json!({
            "userAgent": identity.user_agent,
            "referer": identity.referer,
            "ip": identity.ip_or_unknown(),
        }),
    ));
    metrics().promotions_viewed.inc();

    Ok((cache_control(DETAIL_CACHE_CONTROL), Json(promotion)).into_response())
}

/// GET /api/promotions/:id/stats - Lifetime engagement statistics.
pub async fn stats_handler(
    State(state): State<AppState>,
    identity: ClientIdentity,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    metrics().requests_received.inc();

    state.check_rate_limit(Bucket::General, &identity.key)?;

    let id = parse_promotion_id(&raw_id)?;

    let stats = state
        .store
        .stats(&id)
        .await
        .map_err(|e| state.error(e))?
        .ok_or_else(|| ApiError::from(rebate_core::Error::not_found("Promotion not found")))?;

    Ok(Json(stats).into_response())
}
