//! Fire-and-forget engagement tracking.
//!
//! Handlers push events onto a bounded queue and return immediately. A
//! background task drains the queue into the store. A full or closed
//! queue drops the event with a warning.

use promotion_store::PromotionStore;
use rebate_core::TrackingEvent;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use telemetry::{health, metrics};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Tracking queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Events buffered before new ones are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    1024
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Sending half of the tracking queue.
#[derive(Clone)]
pub struct EventTracker {
    tx: mpsc::Sender<TrackingEvent>,
}

impl EventTracker {
    /// Create a tracker and the receiver that must drain it.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TrackingEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Create a tracker whose events are recorded into `store` by a
    /// background task.
    pub fn spawn(store: Arc<dyn PromotionStore>, config: &TrackingConfig) -> (Self, JoinHandle<()>) {
        let (tracker, rx) = Self::channel(config.queue_capacity);
        let handle = tokio::spawn(run_consumer(rx, store));
        (tracker, handle)
    }

    /// Enqueue an event without waiting.
    pub fn track(&self, event: TrackingEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {
                metrics().tracking_queue_depth.set(self.depth() as u64);
            }
            Err(TrySendError::Full(event)) => {
                metrics().events_dropped.inc();
                warn!(
                    promotion_id = %event.promotion_id,
                    kind = ?event.kind,
                    "Tracking queue full, dropping event"
                );
            }
            Err(TrySendError::Closed(event)) => {
                metrics().events_dropped.inc();
                warn!(
                    promotion_id = %event.promotion_id,
                    kind = ?event.kind,
                    "Tracking queue closed, dropping event"
                );
            }
        }
    }

    /// Events waiting to be recorded.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

/// Drain the queue into the store until every sender is gone.
pub async fn run_consumer(mut rx: mpsc::Receiver<TrackingEvent>, store: Arc<dyn PromotionStore>) {
    health().tracking.set_healthy();
    info!("Tracking consumer started");

    while let Some(event) = rx.recv().await {
        metrics().tracking_queue_depth.set(rx.len() as u64);

        let promotion_id = event.promotion_id;
        let kind = event.kind;
        match store.track_event(event).await {
            Ok(()) => {
                metrics().events_tracked.inc();
                debug!(promotion_id = %promotion_id, kind = ?kind, "Event tracked");
            }
            Err(e) => {
                metrics().tracking_errors.inc();
                warn!(promotion_id = %promotion_id, kind = ?kind, error = %e, "Failed to track event");
            }
        }
    }

    health().tracking.set_unhealthy("tracking queue closed");
    info!("Tracking consumer stopped");
}
