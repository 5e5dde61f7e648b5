//! Application state shared across handlers.

use chrono::Utc;
use promotion_store::PromotionStore;
use rebate_core::RebateCalculator;
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tracing::{debug, error, info};

use crate::middleware::rate_limit::{Bucket, RateLimiter, SharedRateLimiter};
use crate::response::ApiError;
use crate::tracking::EventTracker;

/// Rate limiter cleanup interval.
const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Environment name that hides internal error details.
pub const PRODUCTION: &str = "production";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Promotion catalogue (cached in-memory store in production)
    pub store: Arc<dyn PromotionStore>,
    /// Rate limiter
    pub rate_limiter: SharedRateLimiter,
    /// Analytics event queue
    pub tracker: EventTracker,
    pub calculator: RebateCalculator,
    /// Deployment environment, e.g. "development" or "production"
    pub environment: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PromotionStore>,
        tracker: EventTracker,
        calculator: RebateCalculator,
    ) -> Self {
        Self {
            store,
            rate_limiter: Arc::new(RateLimiter::new()),
            tracker,
            calculator,
            environment: "development".to_string(),
        }
    }

    /// Swap in a different rate limiter.
    pub fn with_rate_limiter(mut self, rate_limiter: SharedRateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Internal error details are returned to callers outside production.
    pub fn expose_error_details(&self) -> bool {
        !self.environment.eq_ignore_ascii_case(PRODUCTION)
    }

    /// Convert a domain error for this environment.
    pub fn error(&self, err: rebate_core::Error) -> ApiError {
        ApiError::from_error(err, self.expose_error_details())
    }

    /// Spend one point of `bucket` for `identity`.
    pub fn check_rate_limit(&self, bucket: Bucket, identity: &str) -> Result<(), ApiError> {
        match self.rate_limiter.consume(bucket, identity) {
            Ok(outcome) => {
                debug!(
                    bucket = bucket.as_str(),
                    identity = %identity,
                    remaining = outcome.remaining_points,
                    "Rate limit consumed"
                );
                Ok(())
            }
            Err(rejection) => {
                metrics().rate_limited_requests.inc();
                info!(
                    bucket = bucket.as_str(),
                    identity = %identity,
                    retry_after_ms = rejection.ms_before_next,
                    "Rate limit exceeded"
                );
                Err(ApiError::rate_limited(rejection))
            }
        }
    }

    /// Start the rate limiter cleanup background task.
    /// Returns a handle that can be used to cancel the task.
    pub fn start_rate_limiter_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let rate_limiter = self.rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                let removed = rate_limiter.cleanup_stale();
                metrics().rate_limit_keys.set(rate_limiter.tracked_keys() as u64);
                if removed > 0 {
                    debug!(removed, "Purged closed rate limit windows");
                }
            }
        })
    }

    /// Start the periodic sweep that deactivates expired promotions.
    pub fn start_expiry_sweep(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.store.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                match store.deactivate_expired(Utc::now()).await {
                    Ok(changed) => {
                        metrics().promotions_expired.inc_by(changed.len() as u64);
                    }
                    Err(e) => error!(error = %e, "Expiry sweep failed"),
                }
            }
        })
    }
}
