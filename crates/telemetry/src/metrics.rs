//! In-process metrics for the rebate engine.
//!
//! Lock-free counters shared by handlers and background tasks, read back
//! through [`Metrics::snapshot`] on the health endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic count.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Last observed level.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn set(&self, level: u64) {
        self.0.store(level, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Upper bounds (ms) of the latency buckets. Anything slower lands in the
/// overflow slot.
const LATENCY_BOUNDS_MS: [u64; 8] = [1, 2, 5, 10, 25, 50, 100, 500];

/// Fixed-bucket latency histogram.
#[derive(Debug, Default)]
pub struct Histogram {
    buckets: [AtomicU64; LATENCY_BOUNDS_MS.len() + 1],
    total_ms: AtomicU64,
    samples: AtomicU64,
}

impl Histogram {
    pub fn observe(&self, ms: u64) {
        let slot = LATENCY_BOUNDS_MS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(LATENCY_BOUNDS_MS.len());
        self.buckets[slot].fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(ms, Ordering::Relaxed);
        self.samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    pub fn mean_ms(&self) -> f64 {
        match self.samples() {
            0 => 0.0,
            n => self.total_ms.load(Ordering::Relaxed) as f64 / n as f64,
        }
    }

    /// Bucket bound below which `quantile` of samples fall. Samples past
    /// the last bound report `None`, as does an empty histogram.
    pub fn quantile_bound_ms(&self, quantile: f64) -> Option<u64> {
        let samples = self.samples();
        if samples == 0 {
            return None;
        }
        let target = (samples as f64 * quantile.clamp(0.0, 1.0)).ceil().max(1.0) as u64;

        let mut seen = 0;
        for (slot, bucket) in self.buckets.iter().enumerate() {
            seen += bucket.load(Ordering::Relaxed);
            if seen >= target {
                return LATENCY_BOUNDS_MS.get(slot).copied();
            }
        }
        None
    }
}

/// Collected metrics for the rebate engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Request metrics
    pub requests_received: Counter,
    pub validation_failures: Counter,
    pub rate_limited_requests: Counter,
    pub internal_errors: Counter,

    // Calculator metrics
    pub calculations_succeeded: Counter,
    pub calculations_rejected: Counter,
    pub recommendation_failures: Counter,

    // Catalogue metrics
    pub promotions_listed: Counter,
    pub promotions_viewed: Counter,
    pub promotions_expired: Counter,

    // Tracking queue metrics
    pub events_tracked: Counter,
    pub events_dropped: Counter,
    pub tracking_errors: Counter,

    // Latency histograms
    pub calculate_latency_ms: Histogram,
    pub list_latency_ms: Histogram,

    // Gauges
    pub tracking_queue_depth: Gauge,
    pub rate_limit_keys: Gauge,
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub requests_received: u64,
    pub validation_failures: u64,
    pub rate_limited_requests: u64,
    pub internal_errors: u64,
    pub calculations_succeeded: u64,
    pub calculations_rejected: u64,
    pub recommendation_failures: u64,
    pub promotions_listed: u64,
    pub promotions_viewed: u64,
    pub promotions_expired: u64,
    pub events_tracked: u64,
    pub events_dropped: u64,
    pub tracking_errors: u64,
    pub calculate_latency_mean_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculate_latency_p95_ms: Option<u64>,
    pub list_latency_mean_ms: f64,
    pub tracking_queue_depth: u64,
    pub rate_limit_keys: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every metric at once.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            requests_received: self.requests_received.get(),
            validation_failures: self.validation_failures.get(),
            rate_limited_requests: self.rate_limited_requests.get(),
            internal_errors: self.internal_errors.get(),
            calculations_succeeded: self.calculations_succeeded.get(),
            calculations_rejected: self.calculations_rejected.get(),
            recommendation_failures: self.recommendation_failures.get(),
            promotions_listed: self.promotions_listed.get(),
            promotions_viewed: self.promotions_viewed.get(),
            promotions_expired: self.promotions_expired.get(),
            events_tracked: self.events_tracked.get(),
            events_dropped: self.events_dropped.get(),
            tracking_errors: self.tracking_errors.get(),
            calculate_latency_mean_ms: self.calculate_latency_ms.mean_ms(),
            calculate_latency_p95_ms: self.calculate_latency_ms.quantile_bound_ms(0.95),
            list_latency_mean_ms: self.list_latency_ms.mean_ms(),
            tracking_queue_depth: self.tracking_queue_depth.get(),
            rate_limit_keys: self.rate_limit_keys.get(),
        }
    }
}

static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Process-wide metrics.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
