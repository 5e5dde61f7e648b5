//! Rebate calculation over a promotion's tiered rate schedule.
//!
//! Everything here is a pure function of its inputs: the same promotion,
//! volume, and clock reading always produce the same result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, PromotionErrorCode, Result};
use crate::limits::{
    DAYS_PER_MONTH, DEFAULT_STANDARD_COMMISSION_PER_LOT, MONTHS_PER_QUARTER, MONTHS_PER_YEAR,
    WEEKS_PER_MONTH,
};
use crate::promotion::{PaymentFrequency, Promotion, PromotionRate, RateType};
use crate::request::CalculateRebateRequest;

/// Outcome of a rebate calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    /// Rebate for one payout period of the matched tier
    pub rebate_amount: f64,
    pub rate_value: f64,
    pub rate_type: RateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier_name: Option<String>,
    pub currency: String,
    pub frequency: PaymentFrequency,
    pub daily_rebate: f64,
    pub monthly_rebate: f64,
    pub yearly_rebate: f64,
    /// Monthly rebate as a percentage of the assumed monthly commission
    pub effective_cost_reduction: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_tier_volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_tier_rebate: Option<f64>,
}

/// Calculator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalculatorConfig {
    /// Commission per lot used as the base for percentage tiers and
    /// cost-reduction figures
    #[serde(default = "default_standard_commission")]
    pub standard_commission_per_lot: f64,
}

fn default_standard_commission() -> f64 {
    DEFAULT_STANDARD_COMMISSION_PER_LOT
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            standard_commission_per_lot: default_standard_commission(),
        }
    }
}

/// Tiered rebate calculator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RebateCalculator {
    config: CalculatorConfig,
}

impl RebateCalculator {
    pub fn new(config: CalculatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    /// Check that `promotion` can be used for `request` at `now`.
    ///
    /// Rules are evaluated in a fixed order and the first failure wins:
    /// inactive, expired, no rates, account type, minimum volume.
    pub fn check_eligibility(
        &self,
        promotion: &Promotion,
        request: &CalculateRebateRequest,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !promotion.is_active {
            return Err(Error::promotion(
                PromotionErrorCode::Inactive,
                "Promotion is no longer active",
            ));
        }

        if promotion.is_expired_at(now) {
            return Err(Error::promotion(
                PromotionErrorCode::Expired,
                "Promotion has expired",
            ));
        }

        if promotion.rates.is_empty() {
            return Err(Error::promotion(
                PromotionErrorCode::NoRatesAvailable,
                "No rates available for this promotion",
            ));
        }

        if let (Some(account_type), Some(allowed)) = (
            request.account_type.as_deref(),
            promotion.requirements.account_types.as_ref(),
        ) {
            if !promotion.accepts_account_type(account_type) {
                return Err(Error::promotion(
                    PromotionErrorCode::InvalidAccountType,
                    format!(
                        "Account type '{}' is not eligible for this promotion. Valid types: {}",
                        account_type,
                        allowed.join(", ")
                    ),
                ));
            }
        }

        if let Some(min_volume) = promotion.requirements.trading_volume {
            if min_volume > 0.0 && request.monthly_volume < min_volume {
                return Err(Error::promotion(
                    PromotionErrorCode::InsufficientVolume,
                    format!("Minimum trading volume of {} lots required", min_volume),
                ));
            }
        }

        Ok(())
    }

    /// Eligibility check followed by the calculation itself.
    pub fn evaluate(
        &self,
        promotion: &Promotion,
        request: &CalculateRebateRequest,
        now: DateTime<Utc>,
    ) -> Result<CalculationResult> {
        self.check_eligibility(promotion, request, now)?;
        self.calculate(promotion, request.monthly_volume)
    }

    /// Select the matching tier and compute the rebate with projections.
    pub fn calculate(&self, promotion: &Promotion, monthly_volume: f64) -> Result<CalculationResult> {
        if promotion.rates.is_empty() {
            return Err(Error::promotion(
                PromotionErrorCode::NoRatesAvailable,
                "No rates available for this promotion",
            ));
        }

        if !monthly_volume.is_finite() || monthly_volume < 0.0 {
            return Err(Error::validation(
                "Monthly volume must be a non-negative number",
            ));
        }

        let rate = find_applicable_rate(&promotion.rates, monthly_volume).ok_or_else(|| {
            Error::promotion(
                PromotionErrorCode::NoApplicableRate,
                "No rate tier found for the specified volume",
            )
        })?;

        let rebate_amount = self.rebate_amount(rate, monthly_volume);
        let monthly_rebate = monthly_equivalent(rebate_amount, rate.frequency);
        // A one-time payout is not recurring: it is the whole year's rebate
        let (daily_rebate, yearly_rebate) = match rate.frequency {
            PaymentFrequency::OneTime => (0.0, rebate_amount),
            _ => (monthly_rebate / DAYS_PER_MONTH, monthly_rebate * MONTHS_PER_YEAR),
        };

        let monthly_cost = monthly_volume * self.config.standard_commission_per_lot;
        let effective_cost_reduction = if monthly_cost > 0.0 {
            monthly_rebate / monthly_cost * 100.0
        } else {
            0.0
        };

        let next_tier = find_next_tier(&promotion.rates, monthly_volume);

        Ok(CalculationResult {
            rebate_amount,
            rate_value: rate.rate_value,
            rate_type: rate.rate_type,
            tier_name: rate.tier_name.clone(),
            currency: rate.currency.clone(),
            frequency: rate.frequency,
            daily_rebate,
            monthly_rebate,
            yearly_rebate,
            effective_cost_reduction,
            next_tier_volume: next_tier.map(|t| t.min_volume),
            next_tier_rebate: next_tier.map(|t| self.rebate_amount(t, t.min_volume)),
        })
    }

    /// Rebate paid by `rate` for one payout period at `volume`.
    pub fn rebate_amount(&self, rate: &PromotionRate, volume: f64) -> f64 {
        match rate.rate_type {
            RateType::FixedPerLot => rate.rate_value * volume,
            RateType::Percentage => {
                rate.rate_value / 100.0 * (self.config.standard_commission_per_lot * volume)
            }
            RateType::FixedAmount => rate.rate_value,
        }
    }
}

/// First tier, in declared order, whose bracket contains `volume`.
pub fn find_applicable_rate(rates: &[PromotionRate], volume: f64) -> Option<&PromotionRate> {
    rates.iter().find(|rate| rate.contains(volume))
}

/// The tier with the lowest minimum above `volume`.
pub fn find_next_tier(rates: &[PromotionRate], volume: f64) -> Option<&PromotionRate> {
    rates
        .iter()
        .filter(|rate| rate.min_volume > volume)
        .min_by(|a, b| a.min_volume.total_cmp(&b.min_volume))
}

/// Normalise a per-period rebate to a monthly figure.
fn monthly_equivalent(amount: f64, frequency: PaymentFrequency) -> f64 {
    match frequency {
        PaymentFrequency::Daily => amount * DAYS_PER_MONTH,
        PaymentFrequency::Weekly => amount * WEEKS_PER_MONTH,
        PaymentFrequency::Monthly => amount,
        PaymentFrequency::Quarterly => amount / MONTHS_PER_QUARTER,
        PaymentFrequency::OneTime => amount,
    }
}
