use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{AggregateId, EventEnvelope, EventStoreError, Result, Version};

/// Concurrency expectation for an append.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Version the stream must be at before the append. `None` skips the check.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// No version check. Only for fixtures and migrations.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stream must currently be at `version`.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// The stream must not exist yet.
    pub fn expect_new() -> Self {
        Self::expect_version(Version::initial())
    }

    /// Picks `expect_new` or `expect_version` from the version a command
    /// handler loaded.
    pub fn after(loaded: Version) -> Self {
        if loaded == Version::initial() {
            Self::expect_new()
        } else {
            Self::expect_version(loaded)
        }
    }
}

/// Stream of every stored event in commit order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// Append-only event log.
///
/// Implementations must be safe to share between request handlers.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Atomically appends a batch of events to one stream.
    ///
    /// Fails with `ConcurrencyConflict` when `options.expected_version` is
    /// set and the stream has moved on. Returns the stream's new version.
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version>;

    /// All events of one stream, oldest first.
    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>>;

    /// Events of one stream with `version >= from_version`, oldest first.
    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>>;

    /// Every event in the store in commit order. Feeds projections.
    async fn stream_all_events(&self) -> Result<EventStream>;

    /// Current version of a stream, or `None` if it has no events.
    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;
}

/// Convenience methods available on every store.
#[async_trait]
pub trait EventStoreExt: EventStore {
    async fn append_event(&self, event: EventEnvelope, options: AppendOptions) -> Result<Version> {
        self.append(vec![event], options).await
    }

    async fn aggregate_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.get_aggregate_version(aggregate_id).await?.is_some())
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks that a batch targets a single stream with consecutive versions.
pub fn validate_events_for_append(events: &[EventEnvelope]) -> Result<()> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty batch".to_string(),
        ));
    };

    let mut expected = first.version;
    for event in &events[1..] {
        if event.aggregate_id != first.aggregate_id || event.aggregate_type != first.aggregate_type
        {
            return Err(EventStoreError::InvalidAppend(
                "all events in a batch must belong to the same stream".to_string(),
            ));
        }
        expected = expected.next();
        if event.version != expected {
            return Err(EventStoreError::InvalidAppend(format!(
                "versions must be consecutive: expected {expected}, got {}",
                event.version
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: AggregateId, kind: &str, version: i64) -> EventEnvelope {
        EventEnvelope::new(
            id,
            kind,
            Version::new(version),
            "Test",
            serde_json::json!({}),
        )
    }

    #[test]
    fn append_options_after_picks_expect_new_for_fresh_streams() {
        assert_eq!(
            AppendOptions::after(Version::initial()).expected_version,
            Some(Version::initial())
        );
        assert_eq!(
            AppendOptions::after(Version::new(4)).expected_version,
            Some(Version::new(4))
        );
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(
            validate_events_for_append(&[]),
            Err(EventStoreError::InvalidAppend(_))
        ));
    }

    #[test]
    fn mixed_streams_are_rejected() {
        let batch = vec![
            event(AggregateId::new(), "Cart", 1),
            event(AggregateId::new(), "Cart", 2),
        ];
        assert!(validate_events_for_append(&batch).is_err());
    }

    #[test]
    fn gaps_in_versions_are_rejected() {
        let id = AggregateId::new();
        let batch = vec![event(id, "Cart", 1), event(id, "Cart", 3)];
        assert!(validate_events_for_append(&batch).is_err());

        let batch = vec![event(id, "Cart", 1), event(id, "Cart", 2)];
        assert!(validate_events_for_append(&batch).is_ok());
    }
}
