use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AggregateId;

/// Unique identifier of a stored event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of an event within its stream.
///
/// A stream with no events is at version 0; the first event is version 1.
/// Every append states the version it expects the stream to be at, which is
/// how concurrent writers to the same cart or order are detected.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Version of a stream that has no events yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Version of the first event in a stream.
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A persisted domain event together with the data needed to store and
/// route it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,

    /// Event name, e.g. `"CartLineAdded"` or `"OrderPaid"`.
    pub event_type: String,

    pub aggregate_id: AggregateId,

    /// Stream kind, e.g. `"Cart"`, `"Order"`, `"Checkout"`.
    pub aggregate_type: String,

    /// Stream version after this event.
    pub version: Version,

    pub timestamp: DateTime<Utc>,

    pub payload: serde_json::Value,

    /// Free-form metadata such as the acting user.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl EventEnvelope {
    /// Wraps an already-serialized payload.
    pub fn new(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        version: Version,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: event_type.into(),
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            version,
            timestamp: Utc::now(),
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Serializes `event` and wraps it.
    pub fn from_event<T: Serialize>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        version: Version,
        event_type: impl Into<String>,
        event: &T,
    ) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_value(event)?;
        Ok(Self::new(
            aggregate_id,
            aggregate_type,
            version,
            event_type,
            payload,
        ))
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Overrides the timestamp; used when replaying fixtures.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_sequence() {
        assert_eq!(Version::initial().as_i64(), 0);
        assert_eq!(Version::initial().next(), Version::first());
        assert!(Version::new(2) > Version::first());
    }

    #[test]
    fn from_event_serializes_payload() {
        #[derive(Serialize)]
        struct LineAdded {
            product: &'static str,
            qty: u32,
        }

        let id = AggregateId::new();
        let envelope = EventEnvelope::from_event(
            id,
            "Cart",
            Version::first(),
            "CartLineAdded",
            &LineAdded {
                product: "p1",
                qty: 2,
            },
        )
        .unwrap()
        .with_metadata("user_id", serde_json::json!("u-1"));

        assert_eq!(envelope.aggregate_id, id);
        assert_eq!(envelope.aggregate_type, "Cart");
        assert_eq!(envelope.payload["qty"], 2);
        assert_eq!(envelope.metadata["user_id"], "u-1");
    }

    #[test]
    fn each_envelope_gets_its_own_id() {
        let id = AggregateId::new();
        let a = EventEnvelope::new(id, "Cart", Version::first(), "E", serde_json::Value::Null);
        let b = EventEnvelope::new(id, "Cart", Version::first(), "E", serde_json::Value::Null);
        assert_ne!(a.event_id, b.event_id);
    }
}
