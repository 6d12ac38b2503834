//! Mock backend for testing.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::interfaces::{Backend, BackendKind, Result, Row, StorageError, WriteOp};
use crate::registry::{SETTINGS_KEY_COLUMN, SETTINGS_TABLE, SETTINGS_VALUE_COLUMN};

/// Column layout matching `migrations/`.
const PLATFORM_TABLES: &[(&str, &[&str])] = &[
    ("users", &["id", "name", "email", "roles", "clubs", "verified", "banned"]),
    ("clubs", &["id", "name", "description", "badges", "members", "tags", "approved"]),
    ("events", &["id", "title", "date", "club_id", "attendees", "tags", "published"]),
    (
        "forum_posts",
        &["id", "author_id", "title", "body", "replies", "attachments", "approved", "pinned", "created_at"],
    ),
    ("ratings", &["id", "teacher_id", "author_id", "score", "criteria", "comment", "approved"]),
    ("notes", &["id", "title", "subject", "author_id", "files", "approved"]),
    ("teachers", &["id", "name", "subjects", "approved"]),
    ("exams", &["id", "title", "subject", "year", "files", "approved"]),
    (SETTINGS_TABLE, &[SETTINGS_KEY_COLUMN, SETTINGS_VALUE_COLUMN]),
    ("daily_stats", &["date", "visits", "unique_visitors", "signups"]),
    (
        "request_logs",
        &[
            "id", "timestamp", "method", "endpoint", "user_id", "ip", "user_agent", "country", "region",
            "city", "status_code", "latency_ms", "body", "error",
        ],
    ),
];

#[derive(Debug, Clone, Default)]
struct MockTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl MockTable {
    fn insert(&mut self, table: &str, columns: &[String], values: Vec<Value>) -> Result<()> {
        if columns.len() != values.len() {
            return Err(StorageError::ColumnMismatch {
                table: table.to_string(),
                columns: columns.len(),
                values: values.len(),
            });
        }
        if let Some(unknown) = columns.iter().find(|c| !self.columns.contains(c)) {
            return Err(StorageError::Unavailable(format!(
                "table {} has no column {}",
                table, unknown
            )));
        }

        // Rows always carry every column, like a real table
        let mut row: Row = self.columns.iter().map(|c| (c.clone(), Value::Null)).collect();
        for (column, value) in columns.iter().zip(values) {
            row.insert(column.clone(), value);
        }
        self.rows.push(row);
        Ok(())
    }
}

/// Mock backend that keeps tables in memory.
///
/// Tables must be created up front, mirroring pre-provisioned schema.
#[derive(Default)]
pub struct MockBackend {
    tables: RwLock<HashMap<String, MockTable>>,
    unavailable: RwLock<HashSet<String>>,
    failing_inserts: RwLock<HashSet<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_table(&self, table: &str, columns: &[&str]) {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        self.tables.write().await.insert(
            table.to_string(),
            MockTable {
                columns,
                rows: Vec::new(),
            },
        );
    }

    pub async fn create_settings_table(&self) {
        self.create_table(SETTINGS_TABLE, &[SETTINGS_KEY_COLUMN, SETTINGS_VALUE_COLUMN])
            .await;
    }

    /// Create every registered table with the same columns as the shipped
    /// migrations.
    pub async fn provision_platform_tables(&self) {
        for (table, columns) in PLATFORM_TABLES {
            self.create_table(table, columns).await;
        }
    }

    pub async fn drop_table(&self, table: &str) {
        self.tables.write().await.remove(table);
    }

    /// Make every operation on `table` fail as if the backend were down.
    pub async fn set_unavailable(&self, table: &str, unavailable: bool) {
        let mut set = self.unavailable.write().await;
        if unavailable {
            set.insert(table.to_string());
        } else {
            set.remove(table);
        }
    }

    /// Make inserts into `table` fail (deletes still succeed).
    pub async fn set_fail_on_insert(&self, table: &str, fail: bool) {
        let mut set = self.failing_inserts.write().await;
        if fail {
            set.insert(table.to_string());
        } else {
            set.remove(table);
        }
    }

    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub async fn seed_row(&self, table: &str, row: Value) {
        let Value::Object(row) = row else {
            panic!("seed_row expects a JSON object");
        };
        let columns: Vec<String> = row.keys().cloned().collect();
        let values: Vec<Value> = row.values().cloned().collect();
        self.insert_row(table, &columns, values)
            .await
            .expect("seed row");
    }

    async fn check_available(&self, table: &str) -> Result<()> {
        if self.unavailable.read().await.contains(table) {
            return Err(StorageError::Unavailable(format!("{} unavailable", table)));
        }
        Ok(())
    }

    async fn apply(&self, tables: &mut HashMap<String, MockTable>, op: WriteOp) -> Result<()> {
        self.check_available(op.table()).await?;
        match op {
            WriteOp::DeleteAll { table } => {
                let entry = tables
                    .get_mut(&table)
                    .ok_or(StorageError::TableMissing { table: table.clone() })?;
                entry.rows.clear();
                Ok(())
            }
            WriteOp::Insert {
                table,
                columns,
                values,
            } => {
                if self.failing_inserts.read().await.contains(&table) {
                    return Err(StorageError::Unavailable(format!(
                        "insert into {} failed",
                        table
                    )));
                }
                let entry = tables
                    .get_mut(&table)
                    .ok_or(StorageError::TableMissing { table: table.clone() })?;
                entry.insert(&table, &columns, values)
            }
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn query_all(&self, table: &str) -> Result<Vec<Row>> {
        self.check_available(table).await?;
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.rows.clone())
            .ok_or(StorageError::TableMissing {
                table: table.to_string(),
            })
    }

    async fn introspect_columns(&self, table: &str) -> Result<Vec<String>> {
        self.check_available(table).await?;
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.columns.clone())
            .ok_or(StorageError::TableMissing {
                table: table.to_string(),
            })
    }

    async fn delete_all(&self, table: &str) -> Result<()> {
        self.run_in_transaction(vec![WriteOp::DeleteAll {
            table: table.to_string(),
        }])
        .await
    }

    async fn insert_row(&self, table: &str, columns: &[String], values: Vec<Value>) -> Result<()> {
        self.run_in_transaction(vec![WriteOp::Insert {
            table: table.to_string(),
            columns: columns.to_vec(),
            values,
        }])
        .await
    }

    async fn run_in_transaction(&self, ops: Vec<WriteOp>) -> Result<()> {
        let mut tables = self.tables.write().await;
        // Work on a copy; publish only when every op succeeded
        let mut staged = tables.clone();
        for op in ops {
            self.apply(&mut staged, op).await?;
        }
        *tables = staged;
        Ok(())
    }

    async fn upsert_singleton(&self, table: &str, key: &str, value: &str) -> Result<()> {
        self.check_available(table).await?;
        let mut tables = self.tables.write().await;
        let entry = tables.get_mut(table).ok_or(StorageError::TableMissing {
            table: table.to_string(),
        })?;

        entry
            .rows
            .retain(|row| row.get(SETTINGS_KEY_COLUMN).and_then(Value::as_str) != Some(key));
        let mut row = Row::new();
        row.insert(SETTINGS_KEY_COLUMN.to_string(), Value::String(key.to_string()));
        row.insert(SETTINGS_VALUE_COLUMN.to_string(), Value::String(value.to_string()));
        entry.rows.push(row);
        Ok(())
    }
}
