//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

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
///     "code": 1001,
///     "message": "invalid request: pageSize must be between 1 and 100",
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
    /// Numeric error code (see the table on [`GatewayError`]).
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
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | Authentication  | 401 Unauthorized / 403 Forbidden |
/// | 3000–3999 | Upstream/Store  | 500 / 502                    |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Caller parameters are malformed.
    #[error("invalid request: {0}")]
    ValidationFailed(String),

    /// The requested sort dimension is not backed by the key schema.
    #[error("unsupported sort: {0}")]
    UnsupportedSort(String),

    /// No credential was presented.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// A token failed signature or expiry verification, or credentials
    /// did not match.
    #[error("invalid token: {0}")]
    TokenInvalid(String),

    /// The external seismic feed was unreachable or answered non-success.
    #[error("failed to fetch feed: {0}")]
    FetchFailed(String),

    /// A put or batched put against the range store failed.
    #[error("failed to write to store: {0}")]
    StoreWriteFailed(String),

    /// A range query against the store failed.
    #[error("failed to query store: {0}")]
    QueryFailed(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::ValidationFailed(_) => 1001,
            Self::UnsupportedSort(_) => 1002,
            Self::Unauthenticated(_) => 2001,
            Self::TokenInvalid(_) => 2002,
            Self::Internal(_) => 3000,
            Self::FetchFailed(_) => 3001,
            Self::StoreWriteFailed(_) => 3002,
            Self::QueryFailed(_) => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationFailed(_) | Self::UnsupportedSort(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::TokenInvalid(_) => StatusCode::FORBIDDEN,
            Self::FetchFailed(_) => StatusCode::BAD_GATEWAY,
            Self::StoreWriteFailed(_) | Self::QueryFailed(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
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
