//! Domain event abstractions and the codec between events and stored records.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::DomainError;

/// Trait that all domain events implement.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the event type name (used for serialization routing).
    fn event_type(&self) -> &'static str;

    /// Serializes the event payload to JSON.
    fn to_payload(&self) -> serde_json::Value;
}

/// An event ready to be appended to a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct EventData {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
}

/// An event as read back from a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Stream this event belongs to.
    pub stream: String,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// 1-based position within the stream.
    pub event_number: i64,
    /// Timestamp at which the store accepted the event.
    pub recorded_at: DateTime<Utc>,
}

/// Deterministic mapping between domain events and stored records.
pub trait EventCodec<E>: Send + Sync {
    /// Turns a domain event into an appendable record.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Encode` if the event cannot be serialized.
    fn encode(&self, event: &E) -> Result<EventData, DomainError>;

    /// Turns a stored record back into a domain event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Codec` if the payload does not describe an `E`.
    fn decode(&self, record: &RecordedEvent) -> Result<E, DomainError>;
}

/// `serde_json` codec for any serializable domain event.
pub struct JsonEventCodec<E> {
    _event: PhantomData<fn() -> E>,
}

impl<E> JsonEventCodec<E> {
    /// Creates a new `JsonEventCodec`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _event: PhantomData,
        }
    }
}

impl<E> Default for JsonEventCodec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for JsonEventCodec<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonEventCodec")
            .field("event", &std::any::type_name::<E>())
            .finish()
    }
}

impl<E> EventCodec<E> for JsonEventCodec<E>
where
    E: DomainEvent + Serialize + DeserializeOwned,
{
    fn encode(&self, event: &E) -> Result<EventData, DomainError> {
        let payload = serde_json::to_value(event).map_err(|e| DomainError::Encode {
            event_type: event.event_type(),
            message: e.to_string(),
        })?;
        Ok(EventData {
            event_id: Uuid::now_v7(),
            event_type: event.event_type().to_owned(),
            payload,
        })
    }

    fn decode(&self, record: &RecordedEvent) -> Result<E, DomainError> {
        serde_json::from_value(record.payload.clone()).map_err(|e| DomainError::Codec {
            stream: record.stream.clone(),
            event_number: record.event_number,
            message: e.to_string(),
        })
    }
}
