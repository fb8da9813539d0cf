//! Event store connection abstraction.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::event::{EventData, RecordedEvent};

/// Outcome of a single page read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceReadStatus {
    /// The page was read; it may be empty.
    Success,
    /// The stream has never been written to.
    StreamNotFound,
    /// The stream was permanently deleted.
    StreamDeleted,
}

/// One page of a forward stream read.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEventsSlice {
    /// Whether the stream could be read at all.
    pub status: SliceReadStatus,
    /// Events of this page, in stream order.
    pub events: Vec<RecordedEvent>,
    /// Event number to start the next page at.
    pub next_event_number: i64,
    /// Last event number of the stream at read time (`0` when empty).
    pub last_event_number: i64,
    /// `true` when no events follow this page.
    pub is_end_of_stream: bool,
}

impl StreamEventsSlice {
    /// A slice for a stream that does not exist.
    #[must_use]
    pub fn not_found(start: i64) -> Self {
        Self::terminal(SliceReadStatus::StreamNotFound, start)
    }

    /// A slice for a stream that has been deleted.
    #[must_use]
    pub fn deleted(start: i64) -> Self {
        Self::terminal(SliceReadStatus::StreamDeleted, start)
    }

    fn terminal(status: SliceReadStatus, start: i64) -> Self {
        Self {
            status,
            events: Vec::new(),
            next_event_number: start,
            last_event_number: 0,
            is_end_of_stream: true,
        }
    }
}

/// Connection to an append-only, per-stream ordered event store.
///
/// Event numbers are 1-based; a stream's version is its last event number
/// and a stream without events has version `0`.
#[async_trait]
pub trait EventStoreConnection: Send + Sync {
    /// Reads up to `count` events of `stream` starting at event number
    /// `start`, in stream order.
    async fn read_stream_events_forward(
        &self,
        stream: &str,
        start: i64,
        count: usize,
    ) -> Result<StreamEventsSlice, DomainError>;

    /// Appends `events` to `stream` with optimistic concurrency and returns
    /// the new stream version. `expected_version` is the last known version.
    async fn append_to_stream(
        &self,
        stream: &str,
        expected_version: i64,
        events: &[EventData],
    ) -> Result<i64, DomainError>;

    /// Permanently deletes `stream`.
    async fn delete_stream(&self, stream: &str) -> Result<(), DomainError>;
}
