//! Promotion repository for the rebate engine.
//!
//! Handlers only see the [`PromotionStore`] trait. The in-memory store is
//! the reference implementation and [`CachedStore`] layers a read-through
//! cache over any other store.

pub mod cached;
pub mod config;
pub mod memory;
pub mod seed;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rebate_core::{Promotion, PromotionPage, PromotionQuery, PromotionStats, Result, TrackingEvent};
use uuid::Uuid;

pub use cached::CachedStore;
pub use config::StoreConfig;
pub use memory::InMemoryStore;
pub use seed::load_seed_file;

/// Read and analytics access to the promotion catalogue.
#[async_trait]
pub trait PromotionStore: Send + Sync {
    /// Fetch a single promotion with its rates and features.
    async fn get_promotion_by_id(&self, id: &Uuid) -> Result<Option<Promotion>>;

    /// Filter, sort, and paginate the catalogue.
    async fn list_promotions(&self, query: &PromotionQuery) -> Result<PromotionPage>;

    /// Record an engagement event.
    async fn track_event(&self, event: TrackingEvent) -> Result<()>;

    /// Lifetime statistics, `None` when the promotion does not exist.
    async fn stats(&self, id: &Uuid) -> Result<Option<PromotionStats>>;

    /// Deactivate every active promotion whose end date is before `now`.
    /// Returns the IDs that changed.
    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>>;

    /// Whether the backing storage can serve requests.
    fn is_healthy(&self) -> bool {
        true
    }
}
