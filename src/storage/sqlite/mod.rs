//! SQLite engine details: connecting and row decoding.

use std::time::Duration;

use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, SqlitePool, TypeInfo, ValueRef};
use tracing::info;

use crate::config::SqliteConfig;
use crate::interfaces::{Result, Row, StorageError};

/// Open (creating if needed) the database file and build the pool.
pub async fn connect(config: &SqliteConfig) -> Result<SqlitePool> {
    if let Some(parent) = std::path::Path::new(&config.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Unavailable(format!("{}: {}", config.path, e)))?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .create_if_missing(true)
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?;

    info!(path = %config.path, "SQLite backend connected");
    Ok(pool)
}

/// Convert a row into a JSON column map.
///
/// SQLite reports the storage class of each value, so the decode target is
/// picked per value rather than per declared column type.
pub fn decode_row(row: &SqliteRow) -> Row {
    let mut out = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let value = match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => Value::Null,
            Ok(raw) => {
                let type_name = raw.type_info().name().to_string();
                decode_value(row, index, &type_name)
            }
            Err(_) => Value::Null,
        };
        out.insert(column.name().to_string(), value);
    }
    out
}

fn decode_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    let decoded = match type_name {
        "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(index).ok().map(Value::from),
        "REAL" => row.try_get::<f64, _>(index).ok().map(Value::from),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .ok()
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned())),
        _ => row.try_get::<String, _>(index).ok().map(Value::String),
    };
    decoded.unwrap_or_else(|| {
        tracing::debug!(column = index, %type_name, "Undecodable SQLite value, using NULL");
        Value::Null
    })
}
