//! Standardized API responses.
//!
//! Every failure renders as `{ "error": { code, message, details?, timestamp } }`.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use rebate_core::{CalculationResult, Promotion, PromotionErrorCode, RequestErrorCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use telemetry::{HealthReport, MetricsSnapshot};
use tracing::error;

use crate::middleware::rate_limit::RateLimitRejection;

/// Successful calculation payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct CalculateRebateResponse {
    pub result: CalculationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<Promotion>>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    #[serde(flatten)]
    pub report: HealthReport,
    pub metrics: MetricsSnapshot,
}

/// Error details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                details: None,
                timestamp: Utc::now(),
            },
        }
    }
}

/// API error type rendered with the error envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
    pub rate_limit: Option<RateLimitRejection>,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(code, msg),
            rate_limit: None,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_code(
            StatusCode::BAD_REQUEST,
            RequestErrorCode::Validation.code(),
            msg,
        )
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::NOT_FOUND, "NOT_FOUND", msg)
    }

    /// Promotion exists but is inactive or expired.
    pub fn gone(code: PromotionErrorCode, msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::GONE, code.code(), msg)
    }

    pub fn method_not_allowed() -> Self {
        Self::with_code(
            StatusCode::METHOD_NOT_ALLOWED,
            RequestErrorCode::MethodNotAllowed.code(),
            "Method not allowed",
        )
    }

    pub fn rate_limited(rejection: RateLimitRejection) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            response: ErrorResponse::new(
                RequestErrorCode::RateLimited.code(),
                format!(
                    "Too many requests. Please try again in {} seconds.",
                    rejection.retry_after_secs()
                ),
            ),
            rate_limit: Some(rejection),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(
            StatusCode::INTERNAL_SERVER_ERROR,
            RequestErrorCode::Internal.code(),
            msg,
        )
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.response.error.details = Some(details);
        self
    }

    /// Convert a domain error. Server-side failures get a generic message;
    /// the raw error is attached only when `expose_details` is set.
    pub fn from_error(err: rebate_core::Error, expose_details: bool) -> Self {
        if err.is_client_error() {
            return Self::from(err);
        }

        error!(error = %err, "Unexpected error");
        telemetry::metrics().internal_errors.inc();

        let api_err = Self::internal("An unexpected error occurred");
        if expose_details {
            api_err.with_details(Value::String(err.to_string()))
        } else {
            api_err
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.response)).into_response();

        if let Some(rejection) = self.rate_limit {
            let reset_epoch_secs =
                (Utc::now().timestamp_millis() as u64 + rejection.ms_before_next).div_ceil(1000);
            let headers = response.headers_mut();
            for (name, value) in [
                ("x-ratelimit-limit", rejection.limit.to_string()),
                ("x-ratelimit-remaining", rejection.remaining_points.to_string()),
                ("x-ratelimit-reset", reset_epoch_secs.to_string()),
                ("retry-after", rejection.retry_after_secs().to_string()),
            ] {
                if let Ok(value) = HeaderValue::from_str(&value) {
                    headers.insert(name, value);
                }
            }
        }

        response
    }
}

impl From<rebate_core::Error> for ApiError {
    fn from(err: rebate_core::Error) -> Self {
        let status = StatusCode::from_u16(err.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match err {
            rebate_core::Error::Promotion { code, message } => {
                ApiError::with_code(status, code.code(), message)
            }
            rebate_core::Error::Validation(msg) => ApiError::validation(msg),
            other if other.is_client_error() => ApiError::validation(other.to_string()),
            _ => ApiError::internal("An unexpected error occurred"),
        }
    }
}
