//! Promotion engagement events and aggregated statistics.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    View,
    Click,
    Conversion,
}

/// An engagement event recorded against a promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub promotion_id: Uuid,
    pub kind: EventKind,
    /// Free-form context (user agent, referer, calculation inputs)
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl TrackingEvent {
    pub fn new(promotion_id: Uuid, kind: EventKind, metadata: serde_json::Value) -> Self {
        Self {
            promotion_id,
            kind,
            metadata,
            occurred_at: Utc::now(),
        }
    }
}

/// Per-day counters for one promotion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAnalytics {
    pub views: u64,
    pub clicks: u64,
    pub conversions: u64,
}

impl DailyAnalytics {
    pub fn record(&mut self, kind: EventKind) {
        match kind {
            EventKind::View => self.views += 1,
            EventKind::Click => self.clicks += 1,
            EventKind::Conversion => self.conversions += 1,
        }
    }
}

/// Lifetime statistics for one promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionStats {
    pub promotion_id: Uuid,
    pub total_views: u64,
    pub total_clicks: u64,
    pub total_conversions: u64,
    /// Conversions per view, as a percentage
    pub conversion_rate: f64,
    /// Clicks per view, as a percentage
    pub click_through_rate: f64,
    pub days_active: i64,
}

impl PromotionStats {
    /// Aggregate daily counters for a promotion that started at `start_date`.
    pub fn aggregate<'a>(
        promotion_id: Uuid,
        days: impl IntoIterator<Item = (&'a NaiveDate, &'a DailyAnalytics)>,
        start_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let (views, clicks, conversions) = days
            .into_iter()
            .fold((0, 0, 0), |(v, c, conv), (_, day)| {
                (v + day.views, c + day.clicks, conv + day.conversions)
            });

        let percent_of_views = |n: u64| {
            if views > 0 {
                n as f64 / views as f64 * 100.0
            } else {
                0.0
            }
        };

        // Partial days count as a full day
        let elapsed = now.signed_duration_since(start_date);
        let days_active = if elapsed.num_seconds() <= 0 {
            0
        } else {
            (elapsed.num_seconds() + 86_399) / 86_400
        };

        Self {
            promotion_id,
            total_views: views,
            total_clicks: clicks,
            total_conversions: conversions,
            conversion_rate: percent_of_views(conversions),
            click_through_rate: percent_of_views(clicks),
            days_active,
        }
    }
}
