//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! The aggregation core never produces these: it substitutes neutral values
//! instead. They come from request validation, ingestion, and data sources.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "strategy not found: 7",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see [`GatewayError`] code ranges).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                        |
/// |-----------|-----------------|------------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request                    |
/// | 2000–2999 | Not Found       | 404 Not Found                      |
/// | 3000–3999 | Server / Source | 500 Internal / 503 Unavailable     |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A principal string is not in canonical textual form.
    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),

    /// Unsupported chart period string.
    #[error("invalid chart period: {0}")]
    InvalidPeriod(String),

    /// Strategy with the given ID was not found.
    #[error("strategy not found: {0}")]
    StrategyNotFound(u32),

    /// The market snapshot has not been loaded yet.
    #[error("market data is still loading")]
    DataNotReady,

    /// An upstream data source failed.
    #[error("data source error: {0}")]
    SourceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidPrincipal(_) => 1002,
            Self::InvalidPeriod(_) => 1003,
            Self::StrategyNotFound(_) => 2001,
            Self::Internal(_) => 3000,
            Self::SourceError(_) => 3001,
            Self::DataNotReady => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidPrincipal(_) | Self::InvalidPeriod(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::StrategyNotFound(_) => StatusCode::NOT_FOUND,
            Self::SourceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DataNotReady => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
