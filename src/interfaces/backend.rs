//! Storage backend interface.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// One raw row: column name to scalar value, in table column order.
pub type Row = serde_json::Map<String, Value>;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Table missing: {table}")]
    TableMissing { table: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Insert into {table} has {columns} columns but {values} values")]
    ColumnMismatch {
        table: String,
        columns: usize,
        values: usize,
    },

    #[error("Collection '{collection}' expects {expected} data")]
    ShapeMismatch {
        collection: String,
        expected: &'static str,
    },

    #[error("JSON encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Write of collection '{collection}' failed (already committed: {committed:?}): {source}")]
    CollectionWrite {
        collection: String,
        committed: Vec<String>,
        #[source]
        source: Box<StorageError>,
    },

    #[error("Backend already selected for this process")]
    AlreadySelected,

    #[error("No backend selected for this process")]
    NotSelected,

    #[error("Storage configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Whether this error means the table does not exist.
    pub fn is_table_missing(&self) -> bool {
        matches!(self, StorageError::TableMissing { .. })
    }

    /// Whether this error means the backend could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

/// Backend discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Embedded single-file database.
    #[default]
    Sqlite,
    /// Networked database behind a connection pool.
    Postgres,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Postgres => write!(f, "postgres"),
        }
    }
}

/// A single write executed inside [`Backend::run_in_transaction`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Remove every row of the table.
    DeleteAll { table: String },
    /// Insert one row; `values` line up with `columns`.
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<Value>,
    },
}

impl WriteOp {
    /// Table the operation touches.
    pub fn table(&self) -> &str {
        match self {
            WriteOp::DeleteAll { table } | WriteOp::Insert { table, .. } => table,
        }
    }
}

/// Interface for relational storage.
///
/// Both implementations expose identical operations so the snapshot reader,
/// writer and log writer never know which engine serves them. Tables are
/// pre-provisioned; no operation here creates one.
///
/// Implementations:
/// - `SqliteBackend`: embedded file database
/// - `PostgresBackend`: pooled networked database
/// - `MockBackend`: in-memory tables for testing
#[async_trait]
pub trait Backend: Send + Sync {
    /// Which engine serves this backend.
    fn kind(&self) -> BackendKind;

    /// Fetch every row of a table.
    async fn query_all(&self, table: &str) -> Result<Vec<Row>>;

    /// Column names of a table, in declaration order.
    ///
    /// Returns `TableMissing` when the table has no columns.
    async fn introspect_columns(&self, table: &str) -> Result<Vec<String>>;

    /// Delete every row of a table.
    async fn delete_all(&self, table: &str) -> Result<()>;

    /// Insert one row.
    async fn insert_row(&self, table: &str, columns: &[String], values: Vec<Value>) -> Result<()>;

    /// Execute `ops` atomically.
    ///
    /// On any failure every effect is rolled back and the error propagates.
    /// On success every effect is committed before returning.
    async fn run_in_transaction(&self, ops: Vec<WriteOp>) -> Result<()>;

    /// Replace-or-insert the row stored under `key` in a key/value table.
    async fn upsert_singleton(&self, table: &str, key: &str, value: &str) -> Result<()>;
}
