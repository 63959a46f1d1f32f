//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use examprep_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// No default-credit configuration with the requested id.
    #[error("credit configuration not found: {0}")]
    CreditConfigNotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Credit amount is not a positive integer.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Page number below 1.
    #[error("page must be at least 1")]
    InvalidPage,

    /// Page size outside `1..=max`.
    #[error("limit must be between 1 and {max}")]
    InvalidLimit {
        /// Largest accepted page size.
        max: u32,
    },

    /// Conflict - resource already exists or invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Insufficient credits.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// Duplicate ledger entry (idempotency).
    #[error("duplicate event: {0}")]
    DuplicateEvent(String),

    /// Rate limit hit.
    #[error("too many requests: {0}")]
    TooManyRequests(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ApiError {
    /// Machine-readable error code sent to clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::CreditConfigNotFound(_) => "CREDIT_CONFIG_NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidPage => "INVALID_PAGE",
            Self::InvalidLimit { .. } => "INVALID_LIMIT",
            Self::Conflict(_) => "CONFLICT",
            Self::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            Self::DuplicateEvent(_) => "DUPLICATE_EVENT",
            Self::TooManyRequests(_) => "TOO_MANY_REQUESTS",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) | Self::CreditConfigNotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_)
            | Self::InvalidAmount(_)
            | Self::InvalidPage
            | Self::InvalidLimit { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict(_) | Self::DuplicateEvent(_) => StatusCode::CONFLICT,
            Self::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ExternalService(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (message, details) = match &self {
            Self::NotFound(msg)
            | Self::CreditConfigNotFound(msg)
            | Self::BadRequest(msg)
            | Self::InvalidAmount(msg)
            | Self::Conflict(msg)
            | Self::TooManyRequests(msg)
            | Self::ExternalService(msg) => (msg.clone(), None),
            Self::InsufficientCredits { balance, required } => (
                "Insufficient credits".to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::DuplicateEvent(key) => (format!("Already processed: {key}"), None),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                ("An internal error occurred".to_string(), None)
            }
            Self::Unauthorized | Self::Forbidden | Self::InvalidPage | Self::InvalidLimit { .. } => {
                (self.to_string(), None)
            }
        };

        let body = ErrorResponse {
            success: false,
            error: ErrorBody {
                code: self.code(),
                message,
                details,
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            StoreError::InvalidAmount(msg) => Self::InvalidAmount(msg),
            StoreError::InvalidInput(msg) => Self::BadRequest(msg),
            StoreError::DuplicateEntry { kind, key } => Self::DuplicateEvent(format!("{kind} {key}")),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_api_codes() {
        let err: ApiError = StoreError::InsufficientCredits {
            balance: 0,
            required: 1,
        }
        .into();
        assert_eq!(err.code(), "INSUFFICIENT_CREDITS");
        assert_eq!(err.status(), StatusCode::PAYMENT_REQUIRED);

        let err: ApiError = StoreError::not_found("user", "abc").into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = StoreError::InvalidAmount("amount must be positive".into()).into();
        assert_eq!(err.code(), "INVALID_AMOUNT");

        let err: ApiError = StoreError::Database("boom".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        assert_eq!(ApiError::InvalidPage.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidLimit { max: 100 }.code(), "INVALID_LIMIT");
        assert_eq!(
            ApiError::CreditConfigNotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
    }
}
