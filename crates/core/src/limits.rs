//! Input bounds and calculation constants.
//!
//! Values here are part of the HTTP contract; changing them changes which
//! requests are accepted.

// === Request Bounds ===

/// Largest monthly volume (in lots) a calculation accepts.
pub const MAX_MONTHLY_VOLUME: f64 = 1_000_000.0;

/// Canonical UUID pattern (versions 1-5, RFC 4122 variant).
pub const PROMOTION_ID_PATTERN: &str =
    r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$";

// === Pagination ===

/// Page size when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Hard cap on page size.
pub const MAX_PAGE_LIMIT: usize = 100;

// === Recommendations ===

/// Candidates fetched when looking for similar promotions.
pub const RECOMMENDATION_FETCH_LIMIT: usize = 5;

/// Recommendations returned alongside a calculation.
pub const MAX_RECOMMENDATIONS: usize = 3;

// === Calculation ===

/// Commission per standard lot assumed for percentage tiers and
/// cost-reduction figures, in USD.
pub const DEFAULT_STANDARD_COMMISSION_PER_LOT: f64 = 7.0;

/// Days used when spreading a monthly rebate over a day.
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Average weeks in a month.
pub const WEEKS_PER_MONTH: f64 = 4.33;

/// Months per quarter.
pub const MONTHS_PER_QUARTER: f64 = 3.0;

/// Months per year.
pub const MONTHS_PER_YEAR: f64 = 12.0;
