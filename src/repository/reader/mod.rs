//! Snapshot reader.
//!
//! Loads whole collections into a [`Snapshot`]. A collection that cannot be
//! read degrades to an empty placeholder so the remaining collections are
//! still returned.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::snapshot::{CollectionData, Snapshot};
use crate::codec;
use crate::interfaces::{Backend, Result, Row};
use crate::registry::{self, CollectionSchema, Shape, SETTINGS_KEY_COLUMN, SETTINGS_VALUE_COLUMN};

/// Reads collections from the active backend.
#[derive(Clone)]
pub struct SnapshotReader {
    backend: Arc<dyn Backend>,
}

impl SnapshotReader {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Read the named collections, or every registered one when `names` is
    /// `None`.
    ///
    /// Unknown names get no slot. Collections whose read fails get an empty
    /// slot of their shape; this call itself never fails. No locking spans
    /// the per-collection queries.
    #[tracing::instrument(name = "snapshot.read", skip_all, fields(backend = %self.backend.kind()))]
    pub async fn read(&self, names: Option<&[&str]>) -> Snapshot {
        let schemas: Vec<&'static CollectionSchema> = match names {
            Some(names) => names
                .iter()
                .filter_map(|name| {
                    let schema = registry::lookup(name);
                    if schema.is_none() {
                        debug!(collection = %name, "Skipping unregistered collection");
                    }
                    schema
                })
                .collect(),
            None => registry::all().iter().collect(),
        };

        let mut snapshot = Snapshot::new();
        for schema in schemas {
            let data = match self.read_collection(schema).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(
                        collection = schema.name,
                        table = schema.table,
                        error = %e,
                        "Collection unreadable, returning empty"
                    );
                    CollectionData::empty(schema.shape)
                }
            };
            snapshot.insert(schema.name, data);
        }
        snapshot
    }

    async fn read_collection(&self, schema: &CollectionSchema) -> Result<CollectionData> {
        let rows = self.backend.query_all(schema.table).await?;

        Ok(match schema.shape {
            Shape::Array => CollectionData::Array(
                rows.into_iter()
                    .map(|row| codec::decode_record(schema, row))
                    .collect(),
            ),
            Shape::KeyValue { key } => CollectionData::KeyValue(merge_key_values(rows, key)),
            Shape::DateKeyed { key_column } => {
                CollectionData::Keyed(index_by_key(schema.name, rows, key_column))
            }
        })
    }
}

/// Merge (key, value) rows into one object.
///
/// When the distinguished key is present its value is the whole content.
fn merge_key_values(rows: Vec<Row>, distinguished: &str) -> Value {
    let mut merged = Map::new();
    for mut row in rows {
        let Some(Value::String(key)) = row.remove(SETTINGS_KEY_COLUMN) else {
            continue;
        };
        let value = match row.remove(SETTINGS_VALUE_COLUMN) {
            Some(Value::String(text)) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
            Some(other) => other,
            None => Value::Null,
        };
        merged.insert(key, value);
    }

    match merged.remove(distinguished) {
        Some(value) => value,
        None => Value::Object(merged),
    }
}

fn index_by_key(collection: &str, rows: Vec<Row>, key_column: &str) -> BTreeMap<String, Row> {
    let mut entries = BTreeMap::new();
    for row in rows {
        let key = match row.get(key_column) {
            Some(Value::String(key)) => key.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                warn!(%collection, %key_column, "Row without key, skipping");
                continue;
            }
        };
        entries.insert(key, row);
    }
    entries
}
