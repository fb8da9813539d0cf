//! `PostgreSQL` implementation of the `EventStoreConnection` trait.

use aggsource_core::error::DomainError;
use aggsource_core::event::{EventData, RecordedEvent};
use aggsource_core::store::{EventStoreConnection, SliceReadStatus, StreamEventsSlice};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::schema::{CREATE_EVENTS_TABLE, CREATE_STREAMS_TABLE};

/// PostgreSQL-backed event store.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    event_id: Uuid,
    event_type: String,
    payload: serde_json::Value,
    event_number: i64,
    recorded_at: DateTime<Utc>,
}

fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of at most `max_connections` to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the database is unreachable.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(infrastructure)?;
        tracing::info!(max_connections, "connected to event store");
        Ok(Self::new(pool))
    }

    /// Creates the event tables if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a statement fails.
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        for statement in [CREATE_STREAMS_TABLE, CREATE_EVENTS_TABLE] {
            sqlx::raw_sql(statement)
                .execute(&self.pool)
                .await
                .map_err(infrastructure)?;
        }
        Ok(())
    }
}

#[async_trait]
impl EventStoreConnection for PgEventStore {
    async fn read_stream_events_forward(
        &self,
        stream: &str,
        start: i64,
        count: usize,
    ) -> Result<StreamEventsSlice, DomainError> {
        let head: Option<(i64, bool)> =
            sqlx::query_as("SELECT version, deleted FROM event_streams WHERE stream_name = $1")
                .bind(stream)
                .fetch_optional(&self.pool)
                .await
                .map_err(infrastructure)?;

        let last_event_number = match head {
            None => return Ok(StreamEventsSlice::not_found(start)),
            Some((_, true)) => return Ok(StreamEventsSlice::deleted(start)),
            Some((version, false)) => version,
        };

        // Rows committed after the head was read belong to a later page.
        let start = start.max(1);
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT event_id, event_type, payload, event_number, recorded_at \
             FROM stream_events \
             WHERE stream_name = $1 AND event_number >= $2 AND event_number <= $3 \
             ORDER BY event_number \
             LIMIT $4",
        )
        .bind(stream)
        .bind(start)
        .bind(last_event_number)
        .bind(i64::try_from(count).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;

        let next_event_number = rows.last().map_or(start, |row| row.event_number + 1);
        tracing::trace!(stream, start, returned = rows.len(), "page served");
        let events = rows
            .into_iter()
            .map(|row| RecordedEvent {
                event_id: row.event_id,
                stream: stream.to_owned(),
                event_type: row.event_type,
                payload: row.payload,
                event_number: row.event_number,
                recorded_at: row.recorded_at,
            })
            .collect();

        Ok(StreamEventsSlice {
            status: SliceReadStatus::Success,
            events,
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
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        sqlx::query("INSERT INTO event_streams (stream_name) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(stream)
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?;

        let (current, deleted): (i64, bool) = sqlx::query_as(
            "SELECT version, deleted FROM event_streams WHERE stream_name = $1 FOR UPDATE",
        )
        .bind(stream)
        .fetch_one(&mut *tx)
        .await
        .map_err(infrastructure)?;

        if deleted {
            return Err(DomainError::StreamDeleted(stream.to_owned()));
        }
        if current != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                stream: stream.to_owned(),
                expected: expected_version,
                actual: current,
            });
        }

        let mut version = current;
        for data in events {
            version += 1;
            sqlx::query(
                "INSERT INTO stream_events (stream_name, event_number, event_id, event_type, payload) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(stream)
            .bind(version)
            .bind(data.event_id)
            .bind(&data.event_type)
            .bind(&data.payload)
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?;
        }

        sqlx::query("UPDATE event_streams SET version = $2 WHERE stream_name = $1")
            .bind(stream)
            .bind(version)
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?;

        tx.commit().await.map_err(infrastructure)?;
        tracing::debug!(stream, appended = events.len(), version, "events appended");
        Ok(version)
    }

    async fn delete_stream(&self, stream: &str) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        sqlx::query(
            "INSERT INTO event_streams (stream_name, deleted) VALUES ($1, TRUE) \
             ON CONFLICT (stream_name) DO UPDATE SET deleted = TRUE",
        )
        .bind(stream)
        .execute(&mut *tx)
        .await
        .map_err(infrastructure)?;

        sqlx::query("DELETE FROM stream_events WHERE stream_name = $1")
            .bind(stream)
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?;

        tx.commit().await.map_err(infrastructure)?;
        tracing::debug!(stream, "stream deleted");
        Ok(())
    }
}
