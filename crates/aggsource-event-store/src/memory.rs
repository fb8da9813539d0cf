//! In-memory implementation of the `EventStoreConnection` trait.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use aggsource_core::error::DomainError;
use aggsource_core::event::{EventData, RecordedEvent};
use aggsource_core::store::{EventStoreConnection, SliceReadStatus, StreamEventsSlice};
use async_trait::async_trait;
use chrono::Utc;

/// Thread-safe event store that keeps streams in a hash map. Clones share
/// the same streams.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<RwLock<Inner>>,
    page_reads: Arc<AtomicUsize>,
}

#[derive(Debug, Default)]
struct Inner {
    streams: HashMap<String, Vec<RecordedEvent>>,
    deleted: HashSet<String>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of page reads served so far.
    #[must_use]
    pub fn page_reads(&self) -> usize {
        self.page_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStoreConnection for InMemoryEventStore {
    async fn read_stream_events_forward(
        &self,
        stream: &str,
        start: i64,
        count: usize,
    ) -> Result<StreamEventsSlice, DomainError> {
        self.page_reads.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);

        if inner.deleted.contains(stream) {
            return Ok(StreamEventsSlice::deleted(start));
        }
        let Some(events) = inner.streams.get(stream) else {
            return Ok(StreamEventsSlice::not_found(start));
        };

        let start = start.max(1);
        let page: Vec<RecordedEvent> = events
            .iter()
            .filter(|event| event.event_number >= start)
            .take(count)
            .cloned()
            .collect();
        let last_event_number = events.last().map_or(0, |event| event.event_number);
        let next_event_number = page.last().map_or(start, |event| event.event_number + 1);
        tracing::trace!(stream, start, returned = page.len(), "page served");

        Ok(StreamEventsSlice {
            status: SliceReadStatus::Success,
            events: page,
            next_event_number,
            last_event_number,
            is_end_of_stream: next_event_number > last_event_number,
        })
    }

    async fn append_to_stream(
        &self,
        stream: &str,
        expected_version: i64,
        events: &[EventData],
    ) -> Result<i64, DomainError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.deleted.contains(stream) {
            return Err(DomainError::StreamDeleted(stream.to_owned()));
        }

        let current = inner
            .streams
            .get(stream)
            .and_then(|recorded| recorded.last())
            .map_or(0, |event| event.event_number);
        if current != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                stream: stream.to_owned(),
                expected: expected_version,
                actual: current,
            });
        }

        let recorded = inner.streams.entry(stream.to_owned()).or_default();
        let mut version = current;
        let recorded_at = Utc::now();
        for data in events {
            version += 1;
            recorded.push(RecordedEvent {
                event_id: data.event_id,
                stream: stream.to_owned(),
                event_type: data.event_type.clone(),
                payload: data.payload.clone(),
                event_number: version,
                recorded_at,
            });
        }
        tracing::trace!(stream, appended = events.len(), version, "events appended");
        Ok(version)
    }

    async fn delete_stream(&self, stream: &str) -> Result<(), DomainError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.streams.remove(stream);
        inner.deleted.insert(stream.to_owned());
        tracing::trace!(stream, "stream deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn data(n: i64) -> EventData {
        EventData {
            event_id: Uuid::new_v4(),
            event_type: "test.event".to_owned(),
            payload: serde_json::json!({ "n": n }),
        }
    }

    #[tokio::test]
    async fn test_read_of_unknown_stream_is_not_found() {
        let store = InMemoryEventStore::new();

        let slice = store.read_stream_events_forward("s", 1, 10).await.unwrap();

        assert_eq!(slice.status, SliceReadStatus::StreamNotFound);
        assert!(slice.events.is_empty());
        assert_eq!(store.page_reads(), 1);
    }

    #[tokio::test]
    async fn test_append_numbers_events_from_one() {
        // Arrange
        let store = InMemoryEventStore::new();

        // Act
        let version = store
            .append_to_stream("s", 0, &[data(1), data(2)])
            .await
            .unwrap();

        // Assert
        assert_eq!(version, 2);
        let slice = store.read_stream_events_forward("s", 1, 10).await.unwrap();
        let numbers: Vec<i64> = slice.events.iter().map(|e| e.event_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(slice.last_event_number, 2);
        assert!(slice.is_end_of_stream);
    }

    #[tokio::test]
    async fn test_read_pages_through_stream() {
        // Arrange
        let store = InMemoryEventStore::new();
        store
            .append_to_stream("s", 0, &[data(1), data(2), data(3)])
            .await
            .unwrap();

        // Act
        let first = store.read_stream_events_forward("s", 1, 2).await.unwrap();
        let second = store
            .read_stream_events_forward("s", first.next_event_number, 2)
            .await
            .unwrap();

        // Assert
        assert_eq!(first.events.len(), 2);
        assert!(!first.is_end_of_stream);
        assert_eq!(first.next_event_number, 3);
        assert_eq!(second.events.len(), 1);
        assert_eq!(second.events[0].payload, serde_json::json!({ "n": 3 }));
        assert!(second.is_end_of_stream);
    }

    #[tokio::test]
    async fn test_empty_append_creates_an_empty_stream() {
        let store = InMemoryEventStore::new();

        let version = store.append_to_stream("s", 0, &[]).await.unwrap();

        assert_eq!(version, 0);
        let slice = store.read_stream_events_forward("s", 1, 10).await.unwrap();
        assert_eq!(slice.status, SliceReadStatus::Success);
        assert!(slice.events.is_empty());
        assert!(slice.is_end_of_stream);
    }

    #[tokio::test]
    async fn test_stale_expected_version_is_rejected() {
        // Arrange
        let store = InMemoryEventStore::new();
        store.append_to_stream("s", 0, &[data(1)]).await.unwrap();

        // Act
        let result = store.append_to_stream("s", 0, &[data(2)]).await;

        // Assert
        match result {
            Err(DomainError::ConcurrencyConflict {
                stream,
                expected,
                actual,
            }) => {
                assert_eq!(stream, "s");
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deleted_stream_reads_as_deleted_and_rejects_appends() {
        // Arrange
        let store = InMemoryEventStore::new();
        store.append_to_stream("s", 0, &[data(1)]).await.unwrap();

        // Act
        store.delete_stream("s").await.unwrap();

        // Assert
        let slice = store.read_stream_events_forward("s", 1, 10).await.unwrap();
        assert_eq!(slice.status, SliceReadStatus::StreamDeleted);
        let result = store.append_to_stream("s", 1, &[data(2)]).await;
        assert!(matches!(result, Err(DomainError::StreamDeleted(name)) if name == "s"));
    }

    #[tokio::test]
    async fn test_clones_share_streams() {
        let store = InMemoryEventStore::new();
        let clone = store.clone();

        clone.append_to_stream("s", 0, &[data(1)]).await.unwrap();

        let slice = store.read_stream_events_forward("s", 1, 10).await.unwrap();
        assert_eq!(slice.events.len(), 1);
        assert_eq!(clone.page_reads(), 1);
    }
}
