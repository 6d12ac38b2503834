//! Collection schema registry.
//!
//! Declares every logical collection the platform persists: its storage
//! shape, its physical table, and which fields need structured (JSON)
//! encoding or boolean coercion. The reader and writer consult this table
//! and never hard-code column lists; adding a collection means adding an
//! entry here.

/// Storage shape of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Sequence of records, one row each.
    Array,
    /// A single JSON value stored under `key` in the shared settings table.
    KeyValue { key: &'static str },
    /// Map from a natural key (a date string) to a flat record.
    DateKeyed { key_column: &'static str },
}

impl Shape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Array => "array",
            Shape::KeyValue { .. } => "key-value",
            Shape::DateKeyed { .. } => "date-keyed-object",
        }
    }
}

/// Declarative description of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: &'static str,
    pub table: &'static str,
    pub shape: Shape,
    /// Fields holding lists/objects, stored as JSON text.
    pub structured_fields: &'static [&'static str],
    /// Fields holding booleans, stored as 0/1.
    pub boolean_fields: &'static [&'static str],
}

impl CollectionSchema {
    pub fn is_structured(&self, field: &str) -> bool {
        self.structured_fields.contains(&field)
    }

    pub fn is_boolean(&self, field: &str) -> bool {
        self.boolean_fields.contains(&field)
    }
}

/// Shared table holding every key-value collection.
pub const SETTINGS_TABLE: &str = "settings";
/// Key column of the settings table.
pub const SETTINGS_KEY_COLUMN: &str = "key";
/// Serialized-value column of the settings table.
pub const SETTINGS_VALUE_COLUMN: &str = "value";

/// Collection receiving request telemetry.
pub const REQUEST_LOG_COLLECTION: &str = "request_logs";

const fn array(
    name: &'static str,
    structured_fields: &'static [&'static str],
    boolean_fields: &'static [&'static str],
) -> CollectionSchema {
    CollectionSchema {
        name,
        table: name,
        shape: Shape::Array,
        structured_fields,
        boolean_fields,
    }
}

const REQUEST_LOG: CollectionSchema = array(REQUEST_LOG_COLLECTION, &[], &[]);

/// Registry order is also the order a multi-collection write is applied in.
static REGISTRY: &[CollectionSchema] = &[
    array("users", &["roles", "clubs"], &["verified", "banned"]),
    array("clubs", &["badges", "members", "tags"], &["approved"]),
    array("events", &["attendees", "tags"], &["published"]),
    array("forum_posts", &["replies", "attachments"], &["approved", "pinned"]),
    array("ratings", &["criteria"], &["approved"]),
    array("notes", &["files"], &["approved"]),
    array("teachers", &["subjects"], &["approved"]),
    array("exams", &["files"], &["approved"]),
    CollectionSchema {
        name: "settings",
        table: SETTINGS_TABLE,
        shape: Shape::KeyValue { key: "site" },
        structured_fields: &[],
        boolean_fields: &[],
    },
    CollectionSchema {
        name: "daily_stats",
        table: "daily_stats",
        shape: Shape::DateKeyed { key_column: "date" },
        structured_fields: &[],
        boolean_fields: &[],
    },
    REQUEST_LOG,
];

/// Look up a collection by name.
pub fn lookup(name: &str) -> Option<&'static CollectionSchema> {
    REGISTRY.iter().find(|schema| schema.name == name)
}

/// Schema of the append-only request log.
pub fn request_log() -> &'static CollectionSchema {
    &REQUEST_LOG
}

/// Every registered collection, in registry order.
pub fn all() -> &'static [CollectionSchema] {
    REGISTRY
}

/// Every registered collection name, in registry order.
pub fn names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|schema| schema.name)
}
