//! In-memory snapshot of one or more collections.
//!
//! A snapshot is the unit of exchange between the core and its callers: the
//! full result of a read or the full input of a write. It is never cached.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::interfaces::Row;
use crate::registry::{self, Shape};

/// One decoded record: column name to value.
pub type Record = Row;

/// Decoded contents of one collection, by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionData {
    /// Records of an `array` collection.
    Array(Vec<Record>),
    /// Value of a `key-value` collection.
    KeyValue(Value),
    /// Records of a `date-keyed-object` collection, by key.
    Keyed(BTreeMap<String, Record>),
}

impl CollectionData {
    /// Empty instance of a shape.
    pub fn empty(shape: Shape) -> Self {
        match shape {
            Shape::Array => CollectionData::Array(Vec::new()),
            Shape::KeyValue { .. } => CollectionData::KeyValue(Value::Object(Map::new())),
            Shape::DateKeyed { .. } => CollectionData::Keyed(BTreeMap::new()),
        }
    }

    /// Interpret a JSON value as data of the given shape.
    ///
    /// Returns `None` when the value does not have that shape.
    pub fn from_json(shape: Shape, value: Value) -> Option<Self> {
        match (shape, value) {
            (Shape::Array, Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(record) => Some(record),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(CollectionData::Array),
            (Shape::KeyValue { .. }, value) => Some(CollectionData::KeyValue(value)),
            (Shape::DateKeyed { .. }, Value::Object(entries)) => entries
                .into_iter()
                .map(|(key, item)| match item {
                    Value::Object(record) => Some((key, record)),
                    _ => None,
                })
                .collect::<Option<BTreeMap<_, _>>>()
                .map(CollectionData::Keyed),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            CollectionData::Array(records) => {
                Value::Array(records.iter().cloned().map(Value::Object).collect())
            }
            CollectionData::KeyValue(value) => value.clone(),
            CollectionData::Keyed(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, record)| (key.clone(), Value::Object(record.clone())))
                    .collect(),
            ),
        }
    }

    /// Records of an `array` collection.
    pub fn as_records(&self) -> Option<&[Record]> {
        match self {
            CollectionData::Array(records) => Some(records),
            _ => None,
        }
    }

    /// Number of records, or 1 for a key-value blob.
    pub fn len(&self) -> usize {
        match self {
            CollectionData::Array(records) => records.len(),
            CollectionData::KeyValue(Value::Object(map)) => usize::from(!map.is_empty()),
            CollectionData::KeyValue(_) => 1,
            CollectionData::Keyed(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collection name to decoded contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    collections: BTreeMap<String, CollectionData>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, data: CollectionData) -> Self {
        self.insert(name, data);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, data: CollectionData) {
        self.collections.insert(name.into(), data);
    }

    pub fn get(&self, name: &str) -> Option<&CollectionData> {
        self.collections.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CollectionData)> {
        self.collections.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Build a snapshot from a JSON object keyed by collection name.
    ///
    /// Names missing from the registry, and values whose shape does not
    /// match the registered one, are dropped.
    pub fn from_json(value: Value) -> Self {
        let mut snapshot = Snapshot::new();
        let Value::Object(entries) = value else {
            return snapshot;
        };
        for (name, value) in entries {
            let Some(schema) = registry::lookup(&name) else {
                tracing::debug!(collection = %name, "Dropping unregistered collection");
                continue;
            };
            match CollectionData::from_json(schema.shape, value) {
                Some(data) => snapshot.insert(name, data),
                None => tracing::warn!(
                    collection = %name,
                    shape = schema.shape.as_str(),
                    "Dropping collection with mismatched shape"
                ),
            }
        }
        snapshot
    }

    /// JSON object keyed by collection name.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.collections
                .iter()
                .map(|(name, data)| (name.clone(), data.to_json()))
                .collect(),
        )
    }
}
