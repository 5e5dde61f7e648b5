//! Promotion records and their rate tiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::Error;

/// Kind of incentive a broker offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionType {
    Cashback,
    DepositBonus,
    CommissionDiscount,
    CopyTrading,
    VipProgram,
    PlatformBonus,
    WelcomeBonus,
    NoDepositBonus,
    LoyaltyProgram,
    TradingCompetition,
}

impl PromotionType {
    pub const ALL: [PromotionType; 10] = [
        Self::Cashback,
        Self::DepositBonus,
        Self::CommissionDiscount,
        Self::CopyTrading,
        Self::VipProgram,
        Self::PlatformBonus,
        Self::WelcomeBonus,
        Self::NoDepositBonus,
        Self::LoyaltyProgram,
        Self::TradingCompetition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cashback => "cashback",
            Self::DepositBonus => "deposit_bonus",
            Self::CommissionDiscount => "commission_discount",
            Self::CopyTrading => "copy_trading",
            Self::VipProgram => "vip_program",
            Self::PlatformBonus => "platform_bonus",
            Self::WelcomeBonus => "welcome_bonus",
            Self::NoDepositBonus => "no_deposit_bonus",
            Self::LoyaltyProgram => "loyalty_program",
            Self::TradingCompetition => "trading_competition",
        }
    }
}

impl FromStr for PromotionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::validation(format!("Unknown promotion type: {}", s)))
    }
}

impl fmt::Display for PromotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a trader enrolls in a promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMethod {
    Automatic,
    Manual,
    ContactRequired,
}

impl ActivationMethod {
    pub const ALL: [ActivationMethod; 3] = [Self::Automatic, Self::Manual, Self::ContactRequired];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Manual => "manual",
            Self::ContactRequired => "contact_required",
        }
    }
}

impl FromStr for ActivationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::validation(format!("Unknown activation method: {}", s)))
    }
}

impl fmt::Display for ActivationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a tier's rate value turns into money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateType {
    /// Percentage of the assumed commission on the traded volume
    Percentage,
    /// Fixed amount per traded lot
    FixedPerLot,
    /// Flat amount regardless of volume
    FixedAmount,
}

/// How often a rebate is paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    OneTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    Advantage,
    Requirement,
    Note,
    Warning,
}

/// Broker summary embedded in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerSummary {
    pub name: String,
    pub logo: String,
    pub rating: f64,
    #[serde(default)]
    pub platforms: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skype: Option<String>,
}

/// Eligibility rules attached to a promotion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionRequirements {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_deposit: Option<f64>,
    /// Allow-list of account types; absent means any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_types: Option<Vec<String>>,
    /// Minimum monthly volume in lots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trading_volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligible_countries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_countries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_clients_only: Option<bool>,
}

/// A volume bracket of a promotion's rebate schedule.
///
/// Covers `[min_volume, max_volume)`; `max_volume = None` is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionRate {
    pub id: String,
    pub promotion_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier_name: Option<String>,
    pub min_volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_volume: Option<f64>,
    pub rate_type: RateType,
    pub rate_value: f64,
    pub currency: String,
    pub frequency: PaymentFrequency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: u32,
}

impl PromotionRate {
    /// Whether `volume` falls inside this tier's bracket.
    pub fn contains(&self, volume: f64) -> bool {
        volume >= self.min_volume && self.max_volume.map_or(true, |max| volume < max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionFeature {
    pub id: String,
    pub promotion_id: Uuid,
    pub feature_text: String,
    pub feature_type: FeatureType,
    #[serde(default)]
    pub display_order: u32,
    #[serde(default)]
    pub is_highlighted: bool,
}

/// A broker-offered incentive with eligibility rules and a tiered
/// rebate schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: Uuid,
    #[validate(length(min = 1))]
    pub broker_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker: Option<BrokerSummary>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub promotion_type: PromotionType,
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_exclusive: bool,
    #[serde(default)]
    pub is_popular: bool,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub activation_method: ActivationMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<ContactInfo>,
    #[serde(default)]
    pub requirements: PromotionRequirements,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    /// Ordered by `min_volume`; first matching tier wins
    #[serde(default)]
    #[validate(custom(function = "validate_rate_tiers"))]
    pub rates: Vec<PromotionRate>,
    #[serde(default)]
    pub features: Vec<PromotionFeature>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Promotion {
    /// Whether the promotion ended before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.end_date.is_some_and(|end| end < now)
    }

    /// Active and not past its end date.
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now)
    }

    /// Highest headline rate across tiers.
    pub fn max_rate_value(&self) -> Option<f64> {
        self.rates.iter().map(|r| r.rate_value).reduce(f64::max)
    }

    /// Case-insensitive account type eligibility. No allow-list means any.
    pub fn accepts_account_type(&self, account_type: &str) -> bool {
        match &self.requirements.account_types {
            Some(allowed) => allowed
                .iter()
                .any(|t| t.to_lowercase() == account_type.to_lowercase()),
            None => true,
        }
    }

    /// Validate catalogue invariants and convert failures into our error type.
    pub fn check(&self) -> crate::Result<()> {
        self.validate()
            .map_err(|e| Error::validation(format!("Promotion {} rejected: {}", self.id, e)))
    }
}

/// Tiers must be sorted by `min_volume`, non-overlapping, and only the last
/// tier may be unbounded. This is what makes first-match tier selection
/// unambiguous.
fn validate_rate_tiers(rates: &[PromotionRate]) -> Result<(), ValidationError> {
    for rate in rates {
        if !rate.min_volume.is_finite() || rate.min_volume < 0.0 {
            return Err(tier_error("tier_min_volume", "minVolume must be a non-negative number"));
        }
        if !rate.rate_value.is_finite() || rate.rate_value < 0.0 {
            return Err(tier_error("tier_rate_value", "rateValue must be a non-negative number"));
        }
        if let Some(max) = rate.max_volume {
            if max.is_nan() || max <= rate.min_volume {
                return Err(tier_error("tier_range", "maxVolume must exceed minVolume"));
            }
        }
    }

    for pair in rates.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        match current.max_volume {
            None => {
                return Err(tier_error("tier_unbounded", "only the last tier may be unbounded"));
            }
            Some(max) if next.min_volume < max => {
                return Err(tier_error(
                    "tier_overlap",
                    "tiers must be sorted by minVolume and must not overlap",
                ));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

fn tier_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}
