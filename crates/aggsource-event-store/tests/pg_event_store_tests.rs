//! Integration tests for `PgEventStore`. They need a PostgreSQL server
//! reachable through `DATABASE_URL`; run them with `cargo test -- --ignored`.

use aggsource_core::error::DomainError;
use aggsource_core::event::EventData;
use aggsource_core::store::{EventStoreConnection, SliceReadStatus};
use aggsource_event_store::pg_event_store::PgEventStore;
use sqlx::PgPool;
use uuid::Uuid;

/// Helper to build an `EventData` with sensible defaults.
fn make_event_data(n: i64) -> EventData {
    EventData {
        event_id: Uuid::new_v4(),
        event_type: "TestEvent".to_string(),
        payload: serde_json::json!({ "n": n }),
    }
}

// --- read_stream_events_forward ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_read_of_nonexistent_stream_is_not_found(pool: PgPool) {
    let store = PgEventStore::new(pool);

    let slice = store
        .read_stream_events_forward("missing", 1, 10)
        .await
        .unwrap();

    assert_eq!(slice.status, SliceReadStatus::StreamNotFound);
    assert!(slice.events.is_empty());
}

// --- append + read round-trip ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_append_and_read_single_event(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let data = make_event_data(1);

    let version = store
        .append_to_stream("orders-1", 0, std::slice::from_ref(&data))
        .await
        .unwrap();

    assert_eq!(version, 1);
    let slice = store
        .read_stream_events_forward("orders-1", 1, 10)
        .await
        .unwrap();
    assert_eq!(slice.status, SliceReadStatus::Success);
    assert_eq!(slice.events.len(), 1);
    let e = &slice.events[0];
    assert_eq!(e.event_id, data.event_id);
    assert_eq!(e.stream, "orders-1");
    assert_eq!(e.event_type, data.event_type);
    assert_eq!(e.payload, data.payload);
    assert_eq!(e.event_number, 1);
    assert!(slice.is_end_of_stream);
}

// --- paging ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_read_pages_in_sequence_order(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let events: Vec<EventData> = (1..=5).map(make_event_data).collect();
    store.append_to_stream("orders-1", 0, &events).await.unwrap();

    let first = store
        .read_stream_events_forward("orders-1", 1, 2)
        .await
        .unwrap();
    let second = store
        .read_stream_events_forward("orders-1", first.next_event_number, 10)
        .await
        .unwrap();

    assert!(!first.is_end_of_stream);
    assert_eq!(first.last_event_number, 5);
    let numbers: Vec<i64> = first
        .events
        .iter()
        .chain(second.events.iter())
        .map(|e| e.event_number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    assert!(second.is_end_of_stream);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_read_stops_at_stream_head_observed_by_the_page(pool: PgPool) {
    let store = PgEventStore::new(pool.clone());
    store
        .append_to_stream("orders-1", 0, &[make_event_data(1)])
        .await
        .unwrap();
    // A row whose head update is not visible yet, as with an append that
    // commits between the head read and the row read.
    sqlx::query(
        "INSERT INTO stream_events (stream_name, event_number, event_id, event_type, payload) \
         VALUES ('orders-1', 2, $1, 'TestEvent', '{}')",
    )
    .bind(Uuid::new_v4())
    .execute(&pool)
    .await
    .unwrap();

    let slice = store
        .read_stream_events_forward("orders-1", 1, 500)
        .await
        .unwrap();

    assert_eq!(slice.last_event_number, 1);
    let numbers: Vec<i64> = slice.events.iter().map(|e| e.event_number).collect();
    assert_eq!(numbers, vec![1]);
    assert!(slice.is_end_of_stream);
}

// --- concurrency ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_stale_expected_version_is_rejected(pool: PgPool) {
    let store = PgEventStore::new(pool);
    store
        .append_to_stream("orders-1", 0, &[make_event_data(1), make_event_data(2)])
        .await
        .unwrap();

    let result = store
        .append_to_stream("orders-1", 0, &[make_event_data(3)])
        .await;

    match result {
        Err(DomainError::ConcurrencyConflict {
            stream,
            expected,
            actual,
        }) => {
            assert_eq!(stream, "orders-1");
            assert_eq!(expected, 0);
            assert_eq!(actual, 2);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
}

// --- deletion ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_deleted_stream_reads_as_deleted(pool: PgPool) {
    let store = PgEventStore::new(pool);
    store
        .append_to_stream("orders-1", 0, &[make_event_data(1)])
        .await
        .unwrap();

    store.delete_stream("orders-1").await.unwrap();

    let slice = store
        .read_stream_events_forward("orders-1", 1, 10)
        .await
        .unwrap();
    assert_eq!(slice.status, SliceReadStatus::StreamDeleted);
    let result = store
        .append_to_stream("orders-1", 1, &[make_event_data(2)])
        .await;
    assert!(matches!(result, Err(DomainError::StreamDeleted(_))));
}

// --- edge cases ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_empty_append_creates_empty_stream(pool: PgPool) {
    let store = PgEventStore::new(pool);

    let version = store.append_to_stream("orders-1", 0, &[]).await.unwrap();

    assert_eq!(version, 0);
    let slice = store
        .read_stream_events_forward("orders-1", 1, 10)
        .await
        .unwrap();
    assert_eq!(slice.status, SliceReadStatus::Success);
    assert!(slice.events.is_empty());
    assert!(slice.is_end_of_stream);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_ensure_schema_is_idempotent(pool: PgPool) {
    let store = PgEventStore::new(pool);

    store.ensure_schema().await.unwrap();
    store.ensure_schema().await.unwrap();
}
