//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CheckoutError, GatewayError, SETTLEMENT_SUPPORT_MESSAGE};
use domain::{CartError, DomainError, MoneyError, OrderError, ProfileError, ReviewError};
use event_store::EventStoreError;
use projections::ProjectionError;
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed input.
    Validation(String),
    NotFound(String),
    /// Duplicate review, or an order already paid with another payment.
    Conflict(String),
    /// Ownership or role mismatch.
    Forbidden(String),
    /// Missing or invalid bearer token.
    Unauthorized(String),
    /// The payment provider rejected the request.
    Gateway(String),
    UpstreamUnavailable(String),
    /// Another writer won an optimistic-concurrency race.
    ConcurrencyConflict(String),
    /// Payment went through but the order could not be marked paid.
    SettlementFailed(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'static str,
    message: &'a str,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) | ApiError::Gateway(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::ConcurrencyConflict(_) => StatusCode::CONFLICT,
            ApiError::SettlementFailed(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Gateway(_) => "gateway_error",
            ApiError::UpstreamUnavailable(_) => "upstream_unavailable",
            ApiError::ConcurrencyConflict(_) => "concurrency_conflict",
            ApiError::SettlementFailed(_) => "settlement_failed",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::Validation(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::Forbidden(m)
            | ApiError::Unauthorized(m)
            | ApiError::Gateway(m)
            | ApiError::UpstreamUnavailable(m)
            | ApiError::ConcurrencyConflict(m)
            | ApiError::SettlementFailed(m) => m,
            ApiError::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal server error");
            }
            ApiError::UpstreamUnavailable(detail) => {
                tracing::warn!(error = %detail, "upstream unavailable");
            }
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.message(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

fn event_store_error(err: EventStoreError) -> ApiError {
    if err.is_conflict() {
        ApiError::ConcurrencyConflict(err.to_string())
    } else {
        ApiError::Internal(err.to_string())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let message = err.to_string();
        match err {
            DomainError::Cart(e) => match e {
                CartError::NotFound => ApiError::NotFound(message),
                CartError::InvalidQuantity { .. }
                | CartError::InvalidPrice { .. }
                | CartError::ProductRequired
                | CartError::AmountOutOfRange { .. } => ApiError::Validation(message),
            },
            DomainError::Order(e) => match e {
                OrderError::NoItems
                | OrderError::InvalidQuantity { .. }
                | OrderError::InvalidPrice { .. }
                | OrderError::NegativeAmount { .. }
                | OrderError::InvalidAddress { .. }
                | OrderError::AmountOutOfRange
                | OrderError::NotPaid => ApiError::Validation(message),
                OrderError::NotPlaced => ApiError::NotFound(message),
                OrderError::AlreadyPlaced | OrderError::AlreadyPaid { .. } => {
                    ApiError::Conflict(message)
                }
            },
            DomainError::Review(e) => match e {
                ReviewError::ProductNotFound | ReviewError::ReviewNotFound => {
                    ApiError::NotFound(message)
                }
                ReviewError::AlreadyListed | ReviewError::AlreadyReviewed => {
                    ApiError::Conflict(message)
                }
                ReviewError::InvalidListing(_) | ReviewError::InvalidRating { .. } => {
                    ApiError::Validation(message)
                }
                ReviewError::Forbidden => ApiError::Forbidden(message),
            },
            DomainError::Profile(ProfileError::InvalidContact(_)) => ApiError::Validation(message),
            DomainError::AggregateNotFound { .. } => ApiError::NotFound(message),
            DomainError::EventStore(e) => event_store_error(e),
            DomainError::Serialization(_) => ApiError::Internal(message),
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Validation(m) => ApiError::Validation(m),
            CheckoutError::OrderNotFound(_) => ApiError::not_found("Order not found"),
            CheckoutError::Gateway(GatewayError::Rejected(m)) => ApiError::Gateway(m),
            CheckoutError::Gateway(e @ GatewayError::Unavailable(_)) => {
                ApiError::UpstreamUnavailable(e.to_string())
            }
            CheckoutError::Conflict(m) => ApiError::Conflict(m),
            CheckoutError::SettlementFailed { order_id, source } => {
                tracing::error!(%order_id, error = %source, "settlement could not be recorded");
                ApiError::SettlementFailed(SETTLEMENT_SUPPORT_MESSAGE.to_string())
            }
            CheckoutError::Domain(e) => e.into(),
            CheckoutError::EventStore(e) => event_store_error(e),
            CheckoutError::Serialization(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<MoneyError> for ApiError {
    fn from(err: MoneyError) -> Self {
        ApiError::Validation(err.to_string())
    }
}
