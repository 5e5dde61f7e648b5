//! Rebate calculation endpoint.
//!
//! Request flow: rate limit, parse body, look up the promotion, check
//! eligibility, calculate, attach recommendations, track.

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use promotion_store::PromotionStore;
use rebate_core::{
    limits::{MAX_RECOMMENDATIONS, RECOMMENDATION_FETCH_LIMIT},
    CalculateRebateRequest, EventKind, Pagination, Promotion, PromotionFilters, PromotionQuery,
    TrackingEvent,
};
use serde_json::json;
use std::time::Instant;
use telemetry::metrics;
use tracing::{info, warn};

use crate::extractors::ClientIdentity;
use crate::middleware::rate_limit::Bucket;
use crate::response::{ApiError, CalculateRebateResponse};
use crate::routes::{cache_control, CALCULATE_CACHE_CONTROL};
use crate::state::AppState;

/// POST /api/promotions/calculate - Rebate for a monthly trading volume.
pub async fn calculate_handler(
    State(state): State<AppState>,
    identity: ClientIdentity,
    body: Bytes,
) -> Result<Response, ApiError> {
    let start = Instant::now();
    metrics().requests_received.inc();

    state.check_rate_limit(Bucket::Calculator, &identity.key)?;

    let request = CalculateRebateRequest::parse(&body).map_err(|e| {
        metrics().validation_failures.inc();
        ApiError::from(e)
    })?;

    let promotion = state
        .store
        .get_promotion_by_id(&request.promotion_id)
        .await
        .map_err(|e| state.error(e))?
        .ok_or_else(|| ApiError::from(rebate_core::Error::not_found("Promotion not found")))?;

    let result = state
        .calculator
        .evaluate(&promotion, &request, Utc::now())
        .map_err(|e| {
            metrics().calculations_rejected.inc();
            state.error(e)
        })?;

    let recommendations = recommendations(state.store.as_ref(), &promotion).await;

    state.tracker.track(TrackingEvent::new(
        request.promotion_id,
        EventKind::Click,
        json!({
            "action": "calculate_rebate",
            "monthlyVolume": request.monthly_volume,
            "accountType": request.account_type,
            "calculatedRebate": result.rebate_amount,
            "userAgent": identity.user_agent,
            "ip": identity.ip_or_unknown(),
        }),
    ));

    let latency_ms = start.elapsed().as_millis() as u64;
    metrics().calculations_succeeded.inc();
    metrics().calculate_latency_ms.observe(latency_ms);

    info!(
        promotion_id = %request.promotion_id,
        monthly_volume = request.monthly_volume,
        rebate_amount = result.rebate_amount,
        latency_ms = latency_ms,
        "Rebate calculated"
    );

    let response = CalculateRebateResponse {
        result,
        recommendations,
    };

    Ok((cache_control(CALCULATE_CACHE_CONTROL), Json(response)).into_response())
}

/// Active promotions of the same type, excluding `promotion` itself.
///
/// Best effort: a store failure is logged and yields `None`, as does an
/// empty selection.
async fn recommendations(store: &dyn PromotionStore, promotion: &Promotion) -> Option<Vec<Promotion>> {
    let query = PromotionQuery {
        filters: PromotionFilters {
            promotion_types: vec![promotion.promotion_type],
            is_active: Some(true),
            ..Default::default()
        },
        sort: None,
        pagination: Pagination::new(1, RECOMMENDATION_FETCH_LIMIT),
    };

    match store.list_promotions(&query).await {
        Ok(page) => {
            let picks: Vec<Promotion> = page
                .promotions
                .into_iter()
                .filter(|p| p.id != promotion.id)
                .take(MAX_RECOMMENDATIONS)
                .collect();
            (!picks.is_empty()).then_some(picks)
        }
        Err(e) => {
            metrics().recommendation_failures.inc();
            warn!(promotion_id = %promotion.id, error = %e, "Failed to fetch recommendations");
            None
        }
    }
}
