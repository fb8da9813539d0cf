//! Event store database schema.

/// SQL to create the stream head table. A row exists once a stream has been
/// written to or deleted.
pub const CREATE_STREAMS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS event_streams (
    stream_name VARCHAR(512) PRIMARY KEY,
    version     BIGINT NOT NULL DEFAULT 0,
    deleted     BOOLEAN NOT NULL DEFAULT FALSE
);
";

/// SQL to create the events table.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS stream_events (
    stream_name  VARCHAR(512) NOT NULL REFERENCES event_streams (stream_name),
    event_number BIGINT NOT NULL,
    event_id     UUID NOT NULL UNIQUE,
    event_type   VARCHAR(255) NOT NULL,
    payload      JSONB NOT NULL,
    recorded_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (stream_name, event_number)
);
";
