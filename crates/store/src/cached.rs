//! Read-through cache for promotion lookups.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use rebate_core::{Promotion, PromotionPage, PromotionQuery, PromotionStats, Result, TrackingEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::{PromotionStore, StoreConfig};

/// Caches `get_promotion_by_id` hits for a short TTL.
///
/// Misses are not cached so a newly seeded promotion is visible at once.
/// Entries touched by the expiry sweep are invalidated.
#[derive(Clone)]
pub struct CachedStore {
    inner: Arc<dyn PromotionStore>,
    cache: Cache<Uuid, Promotion>,
}

impl CachedStore {
    pub fn new(inner: Arc<dyn PromotionStore>, config: &StoreConfig) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(config.cache_max_capacity)
                .time_to_live(Duration::from_secs(config.cache_ttl_secs))
                .build(),
        }
    }

    /// Drop a cached promotion.
    pub async fn invalidate(&self, id: &Uuid) {
        self.cache.invalidate(id).await;
    }
}

#[async_trait]
impl PromotionStore for CachedStore {
    async fn get_promotion_by_id(&self, id: &Uuid) -> Result<Option<Promotion>> {
        if let Some(cached) = self.cache.get(id).await {
            debug!(promotion_id = %id, "Promotion cache hit");
            return Ok(Some(cached));
        }

        let promotion = self.inner.get_promotion_by_id(id).await?;
        if let Some(promotion) = &promotion {
            self.cache.insert(*id, promotion.clone()).await;
        }
        Ok(promotion)
    }

    async fn list_promotions(&self, query: &PromotionQuery) -> Result<PromotionPage> {
        self.inner.list_promotions(query).await
    }

    async fn track_event(&self, event: TrackingEvent) -> Result<()> {
        self.inner.track_event(event).await
    }

    async fn stats(&self, id: &Uuid) -> Result<Option<PromotionStats>> {
        self.inner.stats(id).await
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let changed = self.inner.deactivate_expired(now).await?;
        for id in &changed {
            self.invalidate(id).await;
        }
        Ok(changed)
    }

    fn is_healthy(&self) -> bool {
        self.inner.is_healthy()
    }
}
