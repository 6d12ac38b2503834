//! Snapshot writer.
//!
//! Replaces whole collections: every collection present in the snapshot is
//! deleted and re-inserted inside its own transaction. Collections are small
//! enough that a full replace beats diffing. A multi-collection write is
//! atomic per collection only.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::snapshot::{CollectionData, Record, Snapshot};
use crate::codec;
use crate::interfaces::{Backend, Result, StorageError, WriteOp};
use crate::registry::{self, CollectionSchema, Shape};

/// Collections touched by a successful write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Collections whose replace transaction committed, in registry order.
    pub committed: Vec<String>,
    /// Collections skipped because their table does not exist.
    pub skipped: Vec<String>,
}

/// Writes snapshots to the active backend.
#[derive(Clone)]
pub struct SnapshotWriter {
    backend: Arc<dyn Backend>,
}

impl SnapshotWriter {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Replace every registered collection present in `snapshot`.
    ///
    /// Collections are processed in registry order. The first failure stops
    /// the call with [`StorageError::CollectionWrite`], naming the failed
    /// collection and those already committed; the failed collection's table
    /// is left exactly as it was.
    #[tracing::instrument(name = "snapshot.write", skip_all, fields(collections = snapshot.len()))]
    pub async fn write(&self, snapshot: &Snapshot) -> Result<WriteOutcome> {
        for name in snapshot.names() {
            if registry::lookup(name).is_none() {
                debug!(collection = %name, "Ignoring unregistered collection");
            }
        }

        let mut outcome = WriteOutcome::default();
        for schema in registry::all() {
            let Some(data) = snapshot.get(schema.name) else {
                continue;
            };

            match self.write_collection(schema, data).await {
                Ok(()) => outcome.committed.push(schema.name.to_string()),
                Err(e) if e.is_table_missing() => {
                    warn!(collection = schema.name, table = schema.table, "Table missing, skipping write");
                    outcome.skipped.push(schema.name.to_string());
                }
                Err(e) => {
                    error!(
                        collection = schema.name,
                        committed = ?outcome.committed,
                        error = %e,
                        "Collection write failed"
                    );
                    return Err(StorageError::CollectionWrite {
                        collection: schema.name.to_string(),
                        committed: outcome.committed,
                        source: Box::new(e),
                    });
                }
            }
        }

        info!(committed = outcome.committed.len(), skipped = outcome.skipped.len(), "Snapshot written");
        Ok(outcome)
    }

    async fn write_collection(&self, schema: &CollectionSchema, data: &CollectionData) -> Result<()> {
        match (schema.shape, data) {
            (Shape::Array, CollectionData::Array(records)) => {
                self.replace_rows(schema, records.clone()).await
            }
            (Shape::DateKeyed { key_column }, CollectionData::Keyed(entries)) => {
                let records = entries
                    .iter()
                    .map(|(key, record)| {
                        let mut record = record.clone();
                        record.insert(key_column.to_string(), Value::String(key.clone()));
                        record
                    })
                    .collect();
                self.replace_rows(schema, records).await
            }
            (Shape::KeyValue { key }, CollectionData::KeyValue(value)) => {
                let text = serde_json::to_string(value)?;
                self.backend.upsert_singleton(schema.table, key, &text).await
            }
            (shape, _) => Err(StorageError::ShapeMismatch {
                collection: schema.name.to_string(),
                expected: shape.as_str(),
            }),
        }
    }

    /// Delete every row and insert `records` in one transaction.
    async fn replace_rows(&self, schema: &CollectionSchema, records: Vec<Record>) -> Result<()> {
        let mut ops = vec![WriteOp::DeleteAll {
            table: schema.table.to_string(),
        }];

        if !records.is_empty() {
            // Columns are discovered at call time; nothing here knows a table layout
            let columns = self.backend.introspect_columns(schema.table).await?;
            ops.extend(records.iter().map(|record| WriteOp::Insert {
                table: schema.table.to_string(),
                columns: columns.clone(),
                values: codec::encode_record(schema, record, &columns),
            }));
        }

        debug!(collection = schema.name, rows = records.len(), "Replacing collection");
        self.backend.run_in_transaction(ops).await
    }
}
