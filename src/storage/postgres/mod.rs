//! PostgreSQL engine details: connecting and row decoding.

use std::time::Duration;

use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Row as _, TypeInfo, ValueRef};
use tracing::info;

use crate::config::PostgresConfig;
use crate::interfaces::{Result, Row, StorageError};

/// Build the connection pool.
pub async fn connect(config: &PostgresConfig) -> Result<PgPool> {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .database(&config.database);
    if !config.password.is_empty() {
        options = options.password(&config.password);
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?;

    info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        "PostgreSQL backend connected"
    );
    Ok(pool)
}

/// Convert a row into a JSON column map.
pub fn decode_row(row: &PgRow) -> Row {
    let mut out = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let value = match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => Value::Null,
            Ok(_) => decode_value(row, index, column.type_info().name()),
            Err(_) => Value::Null,
        };
        out.insert(column.name().to_string(), value);
    }
    out
}

fn decode_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    let decoded = match type_name {
        "INT2" => row.try_get::<i16, _>(index).ok().map(Value::from),
        "INT4" => row.try_get::<i32, _>(index).ok().map(Value::from),
        "INT8" => row.try_get::<i64, _>(index).ok().map(Value::from),
        "FLOAT4" => row.try_get::<f32, _>(index).ok().map(Value::from),
        "FLOAT8" => row.try_get::<f64, _>(index).ok().map(Value::from),
        "BOOL" => row.try_get::<bool, _>(index).ok().map(Value::from),
        "JSON" | "JSONB" => row.try_get::<Value, _>(index).ok(),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(index)
            .ok()
            .map(|ts| Value::String(ts.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(index)
            .ok()
            .map(|ts| Value::String(ts.to_string())),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(index)
            .ok()
            .map(|d| Value::String(d.to_string())),
        _ => row.try_get::<String, _>(index).ok().map(Value::String),
    };
    decoded.unwrap_or_else(|| {
        tracing::debug!(column = index, %type_name, "Undecodable PostgreSQL value, using NULL");
        Value::Null
    })
}
