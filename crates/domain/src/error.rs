//! Domain error types.

use event_store::EventStoreError;
use thiserror::Error;

use crate::cart::CartError;
use crate::order::OrderError;
use crate::product::ReviewError;
use crate::profile::ProfileError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store, including concurrency
    /// conflicts between writers of the same stream.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("{0}")]
    Cart(CartError),

    #[error("{0}")]
    Order(OrderError),

    #[error("{0}")]
    Review(ReviewError),

    #[error("{0}")]
    Profile(ProfileError),

    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// True when another writer appended to the same stream first.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, DomainError::EventStore(e) if e.is_conflict())
    }
}
