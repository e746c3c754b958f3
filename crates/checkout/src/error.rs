//! Checkout error types.

use common::AggregateId;
use domain::DomainError;
use event_store::EventStoreError;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Shown to a buyer whose payment went through but whose order could not
/// be marked paid.
pub const SETTLEMENT_SUPPORT_MESSAGE: &str =
    "Payment successful but failed to update order status. Please contact support.";

/// Errors that can occur during checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Malformed or inconsistent input the client can fix.
    #[error("{0}")]
    Validation(String),

    /// The order does not exist or belongs to someone else.
    #[error("Order not found")]
    OrderNotFound(AggregateId),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The order is already paid with a different payment.
    #[error("{0}")]
    Conflict(String),

    /// Payment succeeded but the order could not be marked paid.
    #[error("{SETTLEMENT_SUPPORT_MESSAGE}")]
    SettlementFailed {
        order_id: AggregateId,
        #[source]
        source: DomainError,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CheckoutError {
    pub fn validation(message: impl Into<String>) -> Self {
        CheckoutError::Validation(message.into())
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
