//! Common test setup functions.

use api::{router, AppState, EventTracker};
use axum::Router;
use axum_test::TestServer;
use parking_lot::Mutex;
use promotion_store::{InMemoryStore, PromotionStore};
use rebate_core::{Promotion, RebateCalculator, Result, TrackingEvent};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::mocks::MockStore;

/// Tracking queue size used by tests.
const TEST_QUEUE_CAPACITY: usize = 256;

/// Test context with an in-memory catalogue.
///
/// This exercises the production code paths by:
/// - Using the real Axum router with all middleware
/// - Using MockStore, which implements PromotionStore over InMemoryStore
/// - Capturing tracking events instead of recording them in the background
pub struct TestContext {
    pub store: Arc<InMemoryStore>,
    pub mock_store: Arc<MockStore>,
    pub router: Router,
    tracking_rx: Mutex<mpsc::Receiver<TrackingEvent>>,
    captured: Mutex<Vec<TrackingEvent>>,
}

impl TestContext {
    /// Create a context with an empty catalogue.
    pub fn new() -> Self {
        Self::with_promotions(Vec::new())
    }

    /// Create a context seeded with `promotions` in the development environment.
    pub fn with_promotions(promotions: impl IntoIterator<Item = Promotion>) -> Self {
        Self::build(promotions, "development")
    }

    /// Create a context that behaves like production (no error details).
    pub fn production(promotions: impl IntoIterator<Item = Promotion>) -> Self {
        Self::build(promotions, "production")
    }

    fn build(promotions: impl IntoIterator<Item = Promotion>, environment: &str) -> Self {
        let store = Arc::new(
            InMemoryStore::from_promotions(promotions).expect("Invalid test promotion"),
        );
        let mock_store = Arc::new(MockStore::new(store.clone()));

        let (tracker, tracking_rx) = EventTracker::channel(TEST_QUEUE_CAPACITY);

        let state = AppState::new(
            mock_store.clone() as Arc<dyn PromotionStore>,
            tracker,
            RebateCalculator::default(),
        )
        .with_environment(environment);
        let router = router(state);

        telemetry::health().store.set_healthy();

        Self {
            store,
            mock_store,
            router,
            tracking_rx: Mutex::new(tracking_rx),
            captured: Mutex::new(Vec::new()),
        }
    }

    /// Start a test server over the router.
    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("Failed to create test server")
    }

    /// All tracking events enqueued so far.
    pub fn captured_events(&self) -> Vec<TrackingEvent> {
        let mut rx = self.tracking_rx.lock();
        let mut captured = self.captured.lock();
        while let Ok(event) = rx.try_recv() {
            captured.push(event);
        }
        captured.clone()
    }

    /// Record captured events in the store.
    ///
    /// This does what the tracking consumer does in production.
    pub async fn process_captured_events(&self) -> Result<usize> {
        let events = self.captured_events();
        self.captured.lock().clear();

        let count = events.len();
        for event in events {
            self.store.track_event(event).await?;
        }
        Ok(count)
    }

    /// Make promotion lookups fail (for 500 paths).
    pub fn set_lookup_failure(&self, fail: bool) {
        self.mock_store.set_fail_lookups(fail);
    }

    /// Make listings fail (for recommendation fallbacks).
    pub fn set_listing_failure(&self, fail: bool) {
        self.mock_store.set_fail_listings(fail);
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
