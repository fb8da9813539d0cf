//! Test connections — mock `EventStoreConnection` implementations for tests.

use aggsource_core::error::DomainError;
use aggsource_core::event::EventData;
use aggsource_core::store::{EventStoreConnection, StreamEventsSlice};
use aggsource_event_store::memory::InMemoryEventStore;
use async_trait::async_trait;

/// A connection that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventStore;

#[async_trait]
impl EventStoreConnection for FailingEventStore {
    async fn read_stream_events_forward(
        &self,
        _stream: &str,
        _start: i64,
        _count: usize,
    ) -> Result<StreamEventsSlice, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn append_to_stream(
        &self,
        _stream: &str,
        _expected_version: i64,
        _events: &[EventData],
    ) -> Result<i64, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn delete_stream(&self, _stream: &str) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// Wraps an `InMemoryEventStore` and yields to the runtime before serving
/// each page, so loads running under one task interleave.
#[derive(Debug, Clone, Default)]
pub struct YieldingEventStore {
    inner: InMemoryEventStore,
}

impl YieldingEventStore {
    /// Creates a yielding view over `inner`; both share the same streams.
    #[must_use]
    pub fn new(inner: InMemoryEventStore) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl EventStoreConnection for YieldingEventStore {
    async fn read_stream_events_forward(
        &self,
        stream: &str,
        start: i64,
        count: usize,
    ) -> Result<StreamEventsSlice, DomainError> {
        tokio::task::yield_now().await;
        self.inner
            .read_stream_events_forward(stream, start, count)
            .await
    }

    async fn append_to_stream(
        &self,
        stream: &str,
        expected_version: i64,
        events: &[EventData],
    ) -> Result<i64, DomainError> {
        self.inner
            .append_to_stream(stream, expected_version, events)
            .await
    }

    async fn delete_stream(&self, stream: &str) -> Result<(), DomainError> {
        self.inner.delete_stream(stream).await
    }
}
