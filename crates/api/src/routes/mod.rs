//! API routes.

pub mod calculate;
pub mod health;
pub mod promotions;

use axum::{
    http::{header, HeaderValue, StatusCode},
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::middleware::cors::CorsConfig;
use crate::response::ApiError;
use crate::state::AppState;

/// `Cache-Control` for rebate calculations.
pub const CALCULATE_CACHE_CONTROL: &str = "public, max-age=60, s-maxage=120";
/// `Cache-Control` for a single promotion.
pub const DETAIL_CACHE_CONTROL: &str = "public, max-age=600, s-maxage=1200";
/// `Cache-Control` for promotion listings.
pub const LIST_CACHE_CONTROL: &str = "public, max-age=300, s-maxage=600";

pub(crate) fn cache_control(value: &'static str) -> [(header::HeaderName, HeaderValue); 1] {
    [(header::CACHE_CONTROL, HeaderValue::from_static(value))]
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

/// Creates the API router with the default CORS policy.
pub fn router(state: AppState) -> Router {
    router_with_cors(state, &CorsConfig::default())
}

/// Creates the API router.
pub fn router_with_cors(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .route(
            "/api/promotions",
            get(promotions::list_handler)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/promotions/calculate",
            post(calculate::calculate_handler)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/promotions/:id",
            get(promotions::detail_handler)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/promotions/:id/stats",
            get(promotions::stats_handler)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .fallback(not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors.layer())
        .with_state(state)
}
