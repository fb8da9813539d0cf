//! Paged forward reading of a single event stream.

use crate::config::ReaderConfiguration;
use crate::error::DomainError;
use crate::store::{EventStoreConnection, SliceReadStatus};

/// Result of reading one stream to its end.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamReadOutcome<E> {
    /// The stream has never existed.
    NotFound,
    /// The stream existed and was permanently deleted.
    StreamDeleted,
    /// The stream's events in order, with the version observed at the end.
    Events {
        /// Decoded events.
        events: Vec<E>,
        /// Last event number of the stream (`0` when it holds no events).
        version: i64,
    },
}

impl<E> StreamReadOutcome<E> {
    /// Returns `true` unless the outcome carries at least one event.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::NotFound | Self::StreamDeleted => true,
            Self::Events { events, .. } => events.is_empty(),
        }
    }
}

/// Reads a stream page by page and decodes every record.
///
/// Pages are requested one at a time; no two requests for the same stream
/// are ever in flight together.
pub struct PagedEventReader<'a, E> {
    connection: &'a dyn EventStoreConnection,
    configuration: &'a ReaderConfiguration<E>,
}

impl<'a, E> PagedEventReader<'a, E> {
    /// Creates a reader borrowing `connection` for its lifetime.
    #[must_use]
    pub fn new(
        connection: &'a dyn EventStoreConnection,
        configuration: &'a ReaderConfiguration<E>,
    ) -> Self {
        Self {
            connection,
            configuration,
        }
    }

    /// Reads the stream of `identifier` from its first event.
    ///
    /// # Errors
    ///
    /// Propagates connection errors unchanged and returns
    /// `DomainError::Codec` for a record that cannot be decoded.
    pub async fn read(&self, identifier: &str) -> Result<StreamReadOutcome<E>, DomainError> {
        self.read_from(identifier, 1).await
    }

    /// Reads the stream of `identifier` starting at event number `start`.
    ///
    /// # Errors
    ///
    /// Propagates connection errors unchanged and returns
    /// `DomainError::Codec` for a record that cannot be decoded.
    #[tracing::instrument(skip(self), fields(stream = tracing::field::Empty))]
    pub async fn read_from(
        &self,
        identifier: &str,
        start: i64,
    ) -> Result<StreamReadOutcome<E>, DomainError> {
        let stream = self.configuration.stream_name(identifier);
        tracing::Span::current().record("stream", stream.as_str());
        let page_size = self.configuration.page_size();
        let codec = self.configuration.codec();

        let mut events = Vec::new();
        let mut next = start;
        loop {
            let slice = self
                .connection
                .read_stream_events_forward(&stream, next, page_size)
                .await?;

            match slice.status {
                SliceReadStatus::StreamNotFound => {
                    tracing::debug!("stream not found");
                    return Ok(StreamReadOutcome::NotFound);
                }
                SliceReadStatus::StreamDeleted => {
                    tracing::debug!("stream deleted");
                    return Ok(StreamReadOutcome::StreamDeleted);
                }
                SliceReadStatus::Success => {}
            }

            tracing::debug!(start = next, received = slice.events.len(), "page read");
            for record in &slice.events {
                events.push(codec.decode(record)?);
            }

            if slice.is_end_of_stream {
                return Ok(StreamReadOutcome::Events {
                    events,
                    version: slice.last_event_number,
                });
            }
            if slice.next_event_number <= next {
                return Err(DomainError::Infrastructure(format!(
                    "store did not advance past event {next} of stream '{stream}'"
                )));
            }
            next = slice.next_event_number;
        }
    }
}
