//! Unified error types for the rebate engine.
//!
//! Error codes are part of the public HTTP contract:
//! - VALIDATION_ERROR, METHOD_NOT_ALLOWED, RATE_LIMIT_EXCEEDED,
//!   INTERNAL_SERVER_ERROR: request-level errors
//! - PROMOTION_*, NO_RATES_AVAILABLE, INVALID_ACCOUNT_TYPE,
//!   INSUFFICIENT_VOLUME, NO_APPLICABLE_RATE: promotion rule violations

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Request-level error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorCode {
    /// Malformed or out-of-range input
    Validation,
    /// Wrong HTTP verb for the route
    MethodNotAllowed,
    /// Caller exhausted its bucket
    RateLimited,
    /// Anything unanticipated
    Internal,
}

impl RequestErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::RateLimited => "RATE_LIMIT_EXCEEDED",
            Self::Internal => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::MethodNotAllowed => 405,
            Self::RateLimited => 429,
            Self::Internal => 500,
        }
    }
}

/// Promotion rule error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionErrorCode {
    NotFound,
    Inactive,
    Expired,
    NoRatesAvailable,
    InvalidAccountType,
    InsufficientVolume,
    NoApplicableRate,
}

impl PromotionErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "PROMOTION_NOT_FOUND",
            Self::Inactive => "PROMOTION_INACTIVE",
            Self::Expired => "PROMOTION_EXPIRED",
            Self::NoRatesAvailable => "NO_RATES_AVAILABLE",
            Self::InvalidAccountType => "INVALID_ACCOUNT_TYPE",
            Self::InsufficientVolume => "INSUFFICIENT_VOLUME",
            Self::NoApplicableRate => "NO_APPLICABLE_RATE",
        }
    }

    /// Get the HTTP status code used by the calculate endpoint.
    ///
    /// The detail endpoint reports `Inactive` and `Expired` as 410 instead.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            _ => 400,
        }
    }

    /// Whether the promotion exists but can no longer be offered.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Inactive | Self::Expired)
    }
}

/// Unified error type for the rebate engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Promotion rule violation with code.
    #[error("[{}] {message}", .code.code())]
    Promotion {
        code: PromotionErrorCode,
        message: String,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a promotion rule error.
    pub fn promotion(code: PromotionErrorCode, msg: impl Into<String>) -> Self {
        Self::Promotion {
            code,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::promotion(PromotionErrorCode::NotFound, msg)
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Promotion { code, .. } => code.http_status(),
            Self::Validation(_) | Self::Serialization(_) => {
                RequestErrorCode::Validation.http_status()
            }
            Self::Store(_) | Self::Internal(_) => RequestErrorCode::Internal.http_status(),
        }
    }

    /// Get the wire error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Promotion { code, .. } => code.code(),
            Self::Validation(_) | Self::Serialization(_) => RequestErrorCode::Validation.code(),
            Self::Store(_) | Self::Internal(_) => RequestErrorCode::Internal.code(),
        }
    }

    /// The promotion rule code, if this is a rule violation.
    pub fn promotion_code(&self) -> Option<PromotionErrorCode> {
        match self {
            Self::Promotion { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the error was caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }
}
