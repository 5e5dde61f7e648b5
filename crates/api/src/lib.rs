//! HTTP API layer for the rebate engine.

pub mod extractors;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;
pub mod tracking;

pub use middleware::cors::CorsConfig;
pub use middleware::rate_limit::{
    Bucket, RateLimit, RateLimitOutcome, RateLimitRejection, RateLimiter, SharedRateLimiter,
};
pub use routes::{router, router_with_cors};
pub use state::AppState;
pub use tracking::{EventTracker, TrackingConfig};
