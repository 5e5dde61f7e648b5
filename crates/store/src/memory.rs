//! In-memory promotion store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use rebate_core::{
    DailyAnalytics, Error, Promotion, PromotionPage, PromotionQuery, PromotionStats, Result,
    TrackingEvent,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};
use uuid::Uuid;

use crate::PromotionStore;

/// Promotion catalogue held in process memory.
///
/// Promotions keep their insertion order, which is the listing order when
/// no sort is requested.
#[derive(Default)]
pub struct InMemoryStore {
    promotions: RwLock<Vec<Promotion>>,
    analytics: RwLock<HashMap<Uuid, BTreeMap<NaiveDate, DailyAnalytics>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-loaded promotions, rejecting the whole
    /// batch if any promotion is invalid.
    pub fn from_promotions(promotions: impl IntoIterator<Item = Promotion>) -> Result<Self> {
        let store = Self::new();
        for promotion in promotions {
            store.insert(promotion)?;
        }
        Ok(store)
    }

    /// Insert or replace a promotion after validating it.
    pub fn insert(&self, promotion: Promotion) -> Result<()> {
        promotion.check()?;

        let mut promotions = self.promotions.write();
        match promotions.iter_mut().find(|p| p.id == promotion.id) {
            Some(existing) => *existing = promotion,
            None => promotions.push(promotion),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.promotions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.promotions.read().is_empty()
    }

    /// Daily counters recorded for a promotion, oldest first.
    pub fn daily_analytics(&self, id: &Uuid) -> Vec<(NaiveDate, DailyAnalytics)> {
        self.analytics
            .read()
            .get(id)
            .map(|days| days.iter().map(|(d, a)| (*d, a.clone())).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PromotionStore for InMemoryStore {
    async fn get_promotion_by_id(&self, id: &Uuid) -> Result<Option<Promotion>> {
        Ok(self.promotions.read().iter().find(|p| &p.id == id).cloned())
    }

    async fn list_promotions(&self, query: &PromotionQuery) -> Result<PromotionPage> {
        let promotions = self.promotions.read();
        Ok(PromotionPage::build(&promotions, query))
    }

    async fn track_event(&self, event: TrackingEvent) -> Result<()> {
        let exists = self.promotions.read().iter().any(|p| p.id == event.promotion_id);
        if !exists {
            return Err(Error::not_found(format!(
                "Promotion {} not found",
                event.promotion_id
            )));
        }

        let day = event.occurred_at.date_naive();
        self.analytics
            .write()
            .entry(event.promotion_id)
            .or_default()
            .entry(day)
            .or_default()
            .record(event.kind);

        debug!(promotion_id = %event.promotion_id, kind = ?event.kind, "Event recorded");
        Ok(())
    }

    async fn stats(&self, id: &Uuid) -> Result<Option<PromotionStats>> {
        let start_date = match self.promotions.read().iter().find(|p| &p.id == id) {
            Some(promotion) => promotion.start_date,
            None => return Ok(None),
        };

        let analytics = self.analytics.read();
        let empty = BTreeMap::new();
        let days = analytics.get(id).unwrap_or(&empty);

        Ok(Some(PromotionStats::aggregate(*id, days, start_date, Utc::now())))
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let mut changed = Vec::new();
        for promotion in self.promotions.write().iter_mut() {
            if promotion.is_active && promotion.is_expired_at(now) {
                promotion.is_active = false;
                promotion.updated_at = now;
                changed.push(promotion.id);
            }
        }

        if !changed.is_empty() {
            info!(count = changed.len(), "Deactivated expired promotions");
        }
        Ok(changed)
    }
}
