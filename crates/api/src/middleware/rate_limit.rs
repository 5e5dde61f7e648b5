//! Per-caller rate limiting.
//!
//! Each (bucket, identity) pair gets a fixed window that opens on its
//! first request. The window's budget is spent one point per request and
//! refilled when the window closes.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shortest wait reported to a rejected caller.
const MIN_RETRY_MS: u64 = 1000;

/// Named usage category with its own budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Chat,
    General,
    Auth,
    Calculator,
}

impl Bucket {
    /// Requests allowed per window.
    pub fn points(&self) -> u32 {
        match self {
            Self::Chat => 30,
            Self::General => 100,
            Self::Auth => 5,
            Self::Calculator => 50,
        }
    }

    /// Window length.
    pub fn duration(&self) -> Duration {
        match self {
            Self::Auth => Duration::from_secs(300),
            _ => Duration::from_secs(60),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::General => "general",
            Self::Auth => "auth",
            Self::Calculator => "calculator",
        }
    }
}

/// Accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOutcome {
    pub limit: u32,
    pub remaining_points: u32,
    /// Time until the window resets
    pub ms_before_next: u64,
}

/// Rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRejection {
    pub limit: u32,
    /// Always 0
    pub remaining_points: u32,
    /// Never below one second
    pub ms_before_next: u64,
}

impl RateLimitRejection {
    /// Whole seconds the caller should wait, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        self.ms_before_next.div_ceil(1000)
    }
}

/// Rate limiting capability injected into the handler state.
pub trait RateLimit: Send + Sync {
    /// Spend one point of `bucket` for `identity`.
    fn consume(&self, bucket: Bucket, identity: &str)
        -> Result<RateLimitOutcome, RateLimitRejection>;

    /// Drop windows that have closed. Returns how many were removed.
    fn cleanup_stale(&self) -> usize {
        0
    }

    /// Number of tracked windows.
    fn tracked_keys(&self) -> usize {
        0
    }
}

/// Shared rate limiter handle.
pub type SharedRateLimiter = Arc<dyn RateLimit>;

struct Window {
    consumed: u32,
    reset_at: Instant,
}

/// In-process fixed-window rate limiter.
#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<(Bucket, String), Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume against an explicit clock reading.
    pub fn consume_at(
        &self,
        bucket: Bucket,
        identity: &str,
        now: Instant,
    ) -> Result<RateLimitOutcome, RateLimitRejection> {
        let limit = bucket.points();
        let mut windows = self.windows.lock();

        let window = windows
            .entry((bucket, identity.to_string()))
            .or_insert_with(|| Window {
                consumed: 0,
                reset_at: now + bucket.duration(),
            });

        // Closed window: start a fresh one
        if now >= window.reset_at {
            window.consumed = 0;
            window.reset_at = now + bucket.duration();
        }

        let ms_before_next = window.reset_at.saturating_duration_since(now).as_millis() as u64;

        if window.consumed >= limit {
            return Err(RateLimitRejection {
                limit,
                remaining_points: 0,
                ms_before_next: ms_before_next.max(MIN_RETRY_MS),
            });
        }

        window.consumed += 1;
        Ok(RateLimitOutcome {
            limit,
            remaining_points: limit - window.consumed,
            ms_before_next,
        })
    }

    /// Remove closed windows as of `now`.
    pub fn cleanup_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, window| window.reset_at > now);
        before - windows.len()
    }
}

impl RateLimit for RateLimiter {
    fn consume(
        &self,
        bucket: Bucket,
        identity: &str,
    ) -> Result<RateLimitOutcome, RateLimitRejection> {
        self.consume_at(bucket, identity, Instant::now())
    }

    fn cleanup_stale(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    fn tracked_keys(&self) -> usize {
        self.windows.lock().len()
    }
}
