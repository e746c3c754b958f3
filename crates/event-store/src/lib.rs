//! Append-only event log for the storefront.
//!
//! Carts, orders, products, profiles and checkout sagas are all persisted
//! as streams of events keyed by [`AggregateId`]. Appends carry an expected
//! stream version so concurrent read-modify-write cycles are detected
//! instead of silently losing updates.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream};
