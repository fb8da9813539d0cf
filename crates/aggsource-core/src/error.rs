//! Domain error types.

use thiserror::Error;

/// Raised by `Repository::get` when no aggregate exists for an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("aggregate {root_type} with identifier '{identifier}' was not found")]
pub struct AggregateNotFoundError {
    /// The identifier that was requested.
    pub identifier: String,
    /// Type name of the root the caller expected.
    pub root_type: &'static str,
}

impl AggregateNotFoundError {
    /// Creates a not-found error for root type `R`.
    #[must_use]
    pub fn of<R>(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            root_type: std::any::type_name::<R>(),
        }
    }
}

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error(transparent)]
    AggregateNotFound(#[from] AggregateNotFoundError),

    /// An aggregate with the same identifier is already tracked.
    #[error("an aggregate with identifier '{0}' was already attached to the unit of work")]
    DuplicateAggregate(String),

    /// The tracked root for an identifier is of another type.
    #[error("aggregate '{identifier}' is tracked with a root other than {expected}")]
    RootTypeMismatch {
        /// The identifier that was requested.
        identifier: String,
        /// Type name of the root the caller expected.
        expected: &'static str,
    },

    /// A required collaborator was not supplied.
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    /// A configuration value is out of range or unparsable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An operation was invoked in a state that does not allow it.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A stored record could not be mapped to a domain event.
    #[error("failed to decode event {event_number} of stream '{stream}': {message}")]
    Codec {
        /// Stream the record belongs to.
        stream: String,
        /// Event number of the record within its stream.
        event_number: i64,
        /// Underlying decoder message.
        message: String,
    },

    /// A domain event could not be serialized for appending.
    #[error("failed to encode event {event_type}: {message}")]
    Encode {
        /// Type name of the event.
        event_type: &'static str,
        /// Underlying encoder message.
        message: String,
    },

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on stream '{stream}': expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The stream that had the conflict.
        stream: String,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// The stream was permanently deleted and accepts no more events.
    #[error("stream '{0}' has been deleted")]
    StreamDeleted(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ledger;

    #[test]
    fn test_not_found_carries_identifier_and_root_type() {
        let err = AggregateNotFoundError::of::<Ledger>("ledger-1");

        assert_eq!(err.identifier, "ledger-1");
        assert_eq!(err.root_type, std::any::type_name::<Ledger>());
        assert!(err.to_string().contains("'ledger-1'"));
    }

    #[test]
    fn test_domain_error_displays_not_found_transparently() {
        let inner = AggregateNotFoundError::of::<Ledger>("x");
        let expected = inner.to_string();

        let err = DomainError::from(inner);

        assert_eq!(err.to_string(), expected);
    }
}
