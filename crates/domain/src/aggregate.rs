//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// A fact that happened in the storefront, named in the past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Stable event name stored alongside the payload.
    fn event_type(&self) -> &'static str;
}

/// An event-sourced consistency boundary: a cart, an order, a product's
/// review collection, a profile or a checkout saga.
///
/// State is rebuilt by replaying events through [`Aggregate::apply`].
/// Command methods on the concrete types inspect the current state and
/// return the events to append, or an error; they never mutate.
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;

    type Error: std::error::Error + Send + Sync;

    /// Stream kind stored with every event, e.g. `"Cart"`.
    fn aggregate_type() -> &'static str;

    /// `None` until the stream's first event has been applied.
    fn id(&self) -> Option<AggregateId>;

    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    /// Folds one event into the state.
    ///
    /// Must be deterministic and infallible: events are facts.
    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
