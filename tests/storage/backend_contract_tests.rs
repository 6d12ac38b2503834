//! Backend contract tests.
//!
//! These tests run against a backend whose tables were created from
//! `migrations/`. Each test resets the tables it touches.

use std::sync::Arc;

use serde_json::{json, Value};

use clubhouse::interfaces::{Backend, Row, StorageError, WriteOp};
use clubhouse::registry;
use clubhouse::repository::{
    CollectionData, LogEntry, LogWriter, Record, Snapshot, SnapshotReader, SnapshotWriter,
};

pub fn record(value: Value) -> Record {
    value.as_object().cloned().expect("record literal must be an object")
}

pub fn club(id: i64, name: &str, badges: Value) -> Record {
    record(json!({
        "id": id,
        "name": name,
        "description": format!("{} club", name),
        "badges": badges,
        "members": [11, 12],
        "tags": [],
        "approved": true,
    }))
}

async fn write(backend: &Arc<dyn Backend>, snapshot: Snapshot) -> Result<(), StorageError> {
    SnapshotWriter::new(backend.clone()).write(&snapshot).await.map(|_| ())
}

async fn read_clubs(backend: &Arc<dyn Backend>) -> Vec<Record> {
    let snapshot = SnapshotReader::new(backend.clone()).read(Some(&["clubs"])).await;
    snapshot
        .get("clubs")
        .and_then(CollectionData::as_records)
        .map(<[Record]>::to_vec)
        .unwrap_or_default()
}

fn by_id<'a>(records: &'a [Record], id: i64) -> &'a Record {
    records
        .iter()
        .find(|r| r["id"] == json!(id))
        .unwrap_or_else(|| panic!("record {} not found", id))
}

// =============================================================================
// Backend primitives
// =============================================================================

pub async fn test_introspect_columns(backend: &Arc<dyn Backend>) {
    let columns = backend
        .introspect_columns("clubs")
        .await
        .expect("introspect should succeed");
    for expected in ["id", "name", "badges", "approved"] {
        assert!(columns.iter().any(|c| c == expected), "missing column {}", expected);
    }
}

pub async fn test_introspect_missing_table(backend: &Arc<dyn Backend>) {
    let err = backend
        .introspect_columns("no_such_table")
        .await
        .expect_err("missing table should fail");
    assert!(err.is_table_missing(), "unexpected error: {}", err);
}

pub async fn test_query_missing_table(backend: &Arc<dyn Backend>) {
    let err = backend
        .query_all("no_such_table")
        .await
        .expect_err("missing table should fail");
    assert!(err.is_table_missing(), "unexpected error: {}", err);
}

pub async fn test_transaction_rolls_back(backend: &Arc<dyn Backend>) {
    backend.delete_all("teachers").await.expect("clear teachers");
    let columns = vec!["id".to_string(), "name".to_string()];
    backend
        .insert_row("teachers", &columns, vec![json!(1), json!("Ada")])
        .await
        .expect("seed teacher");

    let result = backend
        .run_in_transaction(vec![
            WriteOp::DeleteAll {
                table: "teachers".to_string(),
            },
            WriteOp::Insert {
                table: "teachers".to_string(),
                columns: columns.clone(),
                values: vec![json!(2), json!("Grace")],
            },
            // Duplicate primary key
            WriteOp::Insert {
                table: "teachers".to_string(),
                columns,
                values: vec![json!(2), json!("Grace")],
            },
        ])
        .await;
    assert!(result.is_err(), "duplicate key should fail the transaction");

    let rows = backend.query_all("teachers").await.expect("query teachers");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!(1));
}

pub async fn test_upsert_singleton_replaces(backend: &Arc<dyn Backend>) {
    backend.delete_all(registry::SETTINGS_TABLE).await.expect("clear settings");
    backend
        .upsert_singleton(registry::SETTINGS_TABLE, "site", "{\"theme\":\"light\"}")
        .await
        .expect("first upsert");
    backend
        .upsert_singleton(registry::SETTINGS_TABLE, "site", "{\"theme\":\"dark\"}")
        .await
        .expect("second upsert");

    let rows: Vec<Row> = backend
        .query_all(registry::SETTINGS_TABLE)
        .await
        .expect("query settings");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["key"], json!("site"));
    assert_eq!(rows[0]["value"], json!("{\"theme\":\"dark\"}"));
}

// =============================================================================
// Snapshot writer/reader over the backend
// =============================================================================

pub async fn test_clubs_round_trip(backend: &Arc<dyn Backend>) {
    let snapshot = Snapshot::new().with(
        "clubs",
        CollectionData::Array(vec![
            club(1, "Chess", json!(["founder", "champion"])),
            club(2, "Go", json!([])),
        ]),
    );
    write(backend, snapshot).await.expect("write clubs");

    let clubs = read_clubs(backend).await;
    assert_eq!(clubs.len(), 2);
    assert_eq!(by_id(&clubs, 1), &club(1, "Chess", json!(["founder", "champion"])));
    assert_eq!(by_id(&clubs, 2), &club(2, "Go", json!([])));
}

pub async fn test_sparse_record_round_trip(backend: &Arc<dyn Backend>) {
    let written = record(json!({"id": 1, "name": "Robotics", "badges": ["featured"]}));
    let snapshot = Snapshot::new().with("clubs", CollectionData::Array(vec![written.clone()]));
    write(backend, snapshot).await.expect("write clubs");

    let clubs = read_clubs(backend).await;
    assert_eq!(clubs.len(), 1);
    for (field, value) in &written {
        assert_eq!(&clubs[0][field], value, "field {} changed on round trip", field);
    }
    // Columns the record left out read back as their empty forms
    assert_eq!(clubs[0]["members"], json!([]));
    assert_eq!(clubs[0]["approved"], json!(false));
    assert_eq!(clubs[0]["description"], Value::Null);
}

pub async fn test_flags_stored_as_integers(backend: &Arc<dyn Backend>) {
    let mut hidden = club(1, "Chess", json!([]));
    hidden.insert("approved".to_string(), json!(false));
    let snapshot = Snapshot::new().with(
        "clubs",
        CollectionData::Array(vec![hidden, club(2, "Go", json!([]))]),
    );
    write(backend, snapshot).await.expect("write clubs");

    let rows = backend.query_all("clubs").await.expect("query clubs");
    let raw = |id: i64| {
        rows.iter()
            .find(|r| r["id"] == json!(id))
            .map(|r| r["approved"].clone())
    };
    assert_eq!(raw(1), Some(json!(0)));
    assert_eq!(raw(2), Some(json!(1)));
    assert!(rows.iter().all(|r| r["badges"].is_string()));
}

pub async fn test_write_replaces_contents(backend: &Arc<dyn Backend>) {
    let first = Snapshot::new().with(
        "clubs",
        CollectionData::Array(vec![
            club(1, "Chess", json!([])),
            club(2, "Go", json!([])),
            club(3, "Bridge", json!([])),
        ]),
    );
    write(backend, first).await.expect("first write");

    let second = Snapshot::new().with("clubs", CollectionData::Array(vec![club(9, "Poker", json!([]))]));
    write(backend, second).await.expect("second write");

    let clubs = read_clubs(backend).await;
    assert_eq!(clubs.len(), 1);
    assert_eq!(clubs[0], club(9, "Poker", json!([])));
}

pub async fn test_empty_collection_clears_table(backend: &Arc<dyn Backend>) {
    let seeded = Snapshot::new().with("clubs", CollectionData::Array(vec![club(1, "Chess", json!([]))]));
    write(backend, seeded).await.expect("seed write");

    let cleared = Snapshot::new().with("clubs", CollectionData::Array(Vec::new()));
    write(backend, cleared).await.expect("clearing write");

    assert!(read_clubs(backend).await.is_empty());
}

pub async fn test_failed_write_keeps_prior_contents(backend: &Arc<dyn Backend>) {
    let prior = Snapshot::new().with(
        "clubs",
        CollectionData::Array(vec![club(1, "Chess", json!([])), club(2, "Go", json!([]))]),
    );
    write(backend, prior).await.expect("prior write");

    // Second record has no name, which the schema rejects
    let broken = Snapshot::new().with(
        "clubs",
        CollectionData::Array(vec![
            club(3, "Bridge", json!([])),
            record(json!({"id": 4, "approved": true})),
        ]),
    );
    let err = write(backend, broken).await.expect_err("write should fail");
    match err {
        StorageError::CollectionWrite {
            collection,
            committed,
            ..
        } => {
            assert_eq!(collection, "clubs");
            assert!(committed.is_empty());
        }
        other => panic!("unexpected error: {}", other),
    }

    let clubs = read_clubs(backend).await;
    assert_eq!(clubs.len(), 2);
    by_id(&clubs, 1);
    by_id(&clubs, 2);
}

pub async fn test_settings_singleton(backend: &Arc<dyn Backend>) {
    backend.delete_all(registry::SETTINGS_TABLE).await.expect("clear settings");

    for theme in ["light", "dark"] {
        let snapshot = Snapshot::new().with(
            "settings",
            CollectionData::KeyValue(json!({"theme": theme, "maintenance": false})),
        );
        write(backend, snapshot).await.expect("write settings");
    }

    let rows = backend.query_all(registry::SETTINGS_TABLE).await.expect("query settings");
    assert_eq!(rows.len(), 1);

    let snapshot = SnapshotReader::new(backend.clone()).read(Some(&["settings"])).await;
    match snapshot.get("settings") {
        Some(CollectionData::KeyValue(value)) => {
            assert_eq!(value, &json!({"theme": "dark", "maintenance": false}));
        }
        other => panic!("unexpected settings slot: {:?}", other),
    }
}

pub async fn test_daily_stats_keyed_by_date(backend: &Arc<dyn Backend>) {
    let mut entries = std::collections::BTreeMap::new();
    entries.insert("2024-03-01".to_string(), record(json!({"visits": 12, "signups": 1})));
    entries.insert("2024-03-02".to_string(), record(json!({"visits": 30, "signups": 4})));
    let snapshot = Snapshot::new().with("daily_stats", CollectionData::Keyed(entries));
    write(backend, snapshot).await.expect("write daily stats");

    let snapshot = SnapshotReader::new(backend.clone()).read(Some(&["daily_stats"])).await;
    match snapshot.get("daily_stats") {
        Some(CollectionData::Keyed(entries)) => {
            assert_eq!(entries.len(), 2);
            assert_eq!(entries["2024-03-02"]["visits"], json!(30));
            assert_eq!(entries["2024-03-01"]["signups"], json!(1));
        }
        other => panic!("unexpected daily_stats slot: {:?}", other),
    }
}

pub async fn test_read_all_has_every_slot(backend: &Arc<dyn Backend>) {
    let snapshot = SnapshotReader::new(backend.clone()).read(None).await;
    assert_eq!(snapshot.len(), registry::all().len());
    for schema in registry::all() {
        assert!(snapshot.contains(schema.name), "missing slot {}", schema.name);
    }
}

// =============================================================================
// Request log
// =============================================================================

pub async fn test_append_truncates_body(backend: &Arc<dyn Backend>) {
    backend.delete_all("request_logs").await.expect("clear request log");

    let mut entry = LogEntry::new("POST", "/forum_posts", "203.0.113.5");
    entry.status_code = Some(201);
    entry.latency_ms = Some(42);
    entry.body = Some("x".repeat(6000));
    LogWriter::new(backend.clone()).append(&entry).await;

    let rows = backend.query_all("request_logs").await.expect("query request log");
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row["method"], json!("POST"));
    assert_eq!(row["status_code"], json!(201));
    assert_eq!(row["latency_ms"], json!(42));
    let body = row["body"].as_str().expect("body should be text");
    assert_eq!(body.chars().count(), 5000);
    assert!(row["id"].is_number(), "id should be assigned by the backend");
}

#[macro_export]
macro_rules! run_backend_contract_tests {
    ($backend:expr) => {
        use $crate::storage::backend_contract_tests::*;

        // backend primitives
        test_introspect_columns($backend).await;
        println!("  test_introspect_columns: PASSED");

        test_introspect_missing_table($backend).await;
        println!("  test_introspect_missing_table: PASSED");

        test_query_missing_table($backend).await;
        println!("  test_query_missing_table: PASSED");

        test_transaction_rolls_back($backend).await;
        println!("  test_transaction_rolls_back: PASSED");

        test_upsert_singleton_replaces($backend).await;
        println!("  test_upsert_singleton_replaces: PASSED");

        // snapshots
        test_clubs_round_trip($backend).await;
        println!("  test_clubs_round_trip: PASSED");

        test_sparse_record_round_trip($backend).await;
        println!("  test_sparse_record_round_trip: PASSED");

        test_flags_stored_as_integers($backend).await;
        println!("  test_flags_stored_as_integers: PASSED");

        test_write_replaces_contents($backend).await;
        println!("  test_write_replaces_contents: PASSED");

        test_empty_collection_clears_table($backend).await;
        println!("  test_empty_collection_clears_table: PASSED");

        test_failed_write_keeps_prior_contents($backend).await;
        println!("  test_failed_write_keeps_prior_contents: PASSED");

        test_settings_singleton($backend).await;
        println!("  test_settings_singleton: PASSED");

        test_daily_stats_keyed_by_date($backend).await;
        println!("  test_daily_stats_keyed_by_date: PASSED");

        test_read_all_has_every_slot($backend).await;
        println!("  test_read_all_has_every_slot: PASSED");

        // request log
        test_append_truncates_body($backend).await;
        println!("  test_append_truncates_body: PASSED");
    };
}
