//! Aggsource Event Store — concrete `EventStoreConnection` implementations.

pub mod memory;
pub mod pg_event_store;
pub mod schema;
