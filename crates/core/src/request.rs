//! Boundary parsing for calculation requests.
//!
//! Raw JSON never travels past this module: callers get a typed
//! `CalculateRebateRequest` or an `Error::Validation` with a message that
//! is safe to return to the client.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::limits::{MAX_MONTHLY_VOLUME, PROMOTION_ID_PATTERN};

/// Compiled promotion ID regex (lazy initialization).
static PROMOTION_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PROMOTION_ID_PATTERN).expect("invalid promotion ID pattern"));

/// Validate a promotion identifier and parse it.
///
/// Only canonical 8-4-4-4-12 UUIDs of versions 1-5 are accepted; the
/// `uuid` crate alone would also take braced, URN, and simple forms.
pub fn parse_promotion_id(raw: &str) -> Result<Uuid> {
    if raw.is_empty() {
        return Err(Error::validation("Invalid promotion ID"));
    }

    if !PROMOTION_ID_REGEX.is_match(raw) {
        return Err(Error::validation("Invalid promotion ID format"));
    }

    Uuid::parse_str(raw).map_err(|_| Error::validation("Invalid promotion ID format"))
}

/// A validated rebate calculation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRebateRequest {
    pub promotion_id: Uuid,
    /// Lots per month, within `[0, MAX_MONTHLY_VOLUME]`
    pub monthly_volume: f64,
    /// Trimmed, never empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
}

impl CalculateRebateRequest {
    /// Parse a raw request body. An empty body is treated as `{}`.
    pub fn parse(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self::from_value(&Value::Object(Default::default()));
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|_| Error::validation("Invalid JSON in request body"))?;

        Self::from_value(&value)
    }

    /// Validate an already-decoded JSON body.
    pub fn from_value(body: &Value) -> Result<Self> {
        let fields = body
            .as_object()
            .ok_or_else(|| Error::validation("Request body is required"))?;

        let promotion_id = match fields.get("promotionId") {
            Some(Value::String(id)) if !id.is_empty() => parse_promotion_id(id)?,
            _ => {
                return Err(Error::validation(
                    "Promotion ID is required and must be a string",
                ))
            }
        };

        let monthly_volume = parse_monthly_volume(fields.get("monthlyVolume"))?;

        let account_type = match fields.get("accountType") {
            None => None,
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(_) => {
                return Err(Error::validation(
                    "Account type must be a non-empty string if provided",
                ))
            }
        };

        Ok(Self {
            promotion_id,
            monthly_volume,
            account_type,
        })
    }
}

/// Accepts a JSON number or a numeric string.
fn parse_monthly_volume(raw: Option<&Value>) -> Result<f64> {
    let volume = match raw {
        None | Some(Value::Null) => return Err(Error::validation("Monthly volume is required")),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    let volume = match volume {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => {
            return Err(Error::validation(
                "Monthly volume must be a non-negative number",
            ))
        }
    };

    if volume > MAX_MONTHLY_VOLUME {
        return Err(Error::validation(
            "Monthly volume exceeds maximum allowed value (1,000,000 lots)",
        ));
    }

    Ok(volume)
}
