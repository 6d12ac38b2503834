//! Append-only request log writer.
//!
//! Inserts one row per entry without touching existing rows. Columns are
//! introspected per call and the entry is cut down to the ones the table
//! has, so the log table can gain or lose columns independently of this
//! code. Errors never reach the caller.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::codec;
use crate::interfaces::{Backend, Result};
use crate::registry::{self, CollectionSchema};

/// Default cap on stored request bodies, in characters.
pub const DEFAULT_BODY_LIMIT: usize = 5000;
/// Default cap on stored error text, in characters.
pub const DEFAULT_ERROR_LIMIT: usize = 1000;

/// One request-log record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogEntry {
    /// RFC 3339 time the entry was assembled.
    pub timestamp: String,
    pub method: String,
    pub endpoint: String,
    pub user_id: Option<String>,
    pub ip: String,
    pub user_agent: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub status_code: Option<u16>,
    pub latency_ms: Option<u64>,
    pub body: Option<String>,
    pub error: Option<String>,
}

impl LogEntry {
    /// Entry stamped with the current time.
    pub fn new(method: impl Into<String>, endpoint: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            method: method.into(),
            endpoint: endpoint.into(),
            ip: ip.into(),
            ..Default::default()
        }
    }

    /// Cap body and error text at the given character counts.
    pub fn truncated(mut self, body_limit: usize, error_limit: usize) -> Self {
        self.body = self.body.map(|b| truncate_chars(b, body_limit));
        self.error = self.error.map(|e| truncate_chars(e, error_limit));
        self
    }
}

/// Keep at most `limit` characters.
pub fn truncate_chars(text: String, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}

/// Best-effort single-row appender for the request log.
pub struct LogWriter {
    backend: Arc<dyn Backend>,
    schema: &'static CollectionSchema,
    body_limit: usize,
    error_limit: usize,
}

impl LogWriter {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            schema: registry::request_log(),
            body_limit: DEFAULT_BODY_LIMIT,
            error_limit: DEFAULT_ERROR_LIMIT,
        }
    }

    /// Override the body and error caps.
    pub fn with_limits(mut self, body_limit: usize, error_limit: usize) -> Self {
        self.body_limit = body_limit;
        self.error_limit = error_limit;
        self
    }

    /// Append one entry. Failures are logged and dropped.
    pub async fn append(&self, entry: &LogEntry) {
        let entry = entry.clone().truncated(self.body_limit, self.error_limit);
        if let Err(e) = self.try_append(&entry).await {
            warn!(
                table = self.schema.table,
                endpoint = %entry.endpoint,
                error = %e,
                "Failed to append request log entry"
            );
        }
    }

    async fn try_append(&self, entry: &LogEntry) -> Result<()> {
        let Value::Object(fields) = serde_json::to_value(entry)? else {
            return Ok(());
        };

        let available = self.backend.introspect_columns(self.schema.table).await?;
        let (columns, values): (Vec<String>, Vec<Value>) = available
            .into_iter()
            .filter_map(|column| {
                let value = fields.get(&column)?;
                let encoded = codec::encode_field(self.schema, &column, value);
                Some((column, encoded))
            })
            .unzip();

        if columns.is_empty() {
            warn!(table = self.schema.table, "Log table shares no columns with entry");
            return Ok(());
        }

        self.backend
            .insert_row(self.schema.table, &columns, values)
            .await?;
        debug!(endpoint = %entry.endpoint, "Request log entry appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::mock::MockBackend;

    async fn provisioned() -> Arc<MockBackend> {
        let backend = Arc::new(MockBackend::new());
        backend.provision_platform_tables().await;
        backend
    }

    fn entry() -> LogEntry {
        LogEntry {
            user_id: Some("u-42".to_string()),
            status_code: Some(200),
            latency_ms: Some(18),
            ..LogEntry::new("GET", "/clubs", "203.0.113.9")
        }
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("héllo".to_string(), 2), "hé");
        assert_eq!(truncate_chars("abc".to_string(), 10), "abc");
        assert_eq!(truncate_chars("abc".to_string(), 0), "");
    }

    #[tokio::test]
    async fn test_append_inserts_without_deleting() {
        let backend = provisioned().await;
        backend
            .seed_row("request_logs", json!({"id": 1, "method": "POST", "endpoint": "/old"}))
            .await;
        let writer = LogWriter::new(backend.clone());

        writer.append(&entry()).await;

        let rows = backend.rows("request_logs").await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["endpoint"], json!("/clubs"));
        assert_eq!(rows[1]["user_id"], json!("u-42"));
        assert_eq!(rows[1]["status_code"], json!(200));
        assert_eq!(rows[1]["country"], Value::Null);
    }

    #[tokio::test]
    async fn test_append_truncates_long_body() {
        let backend = provisioned().await;
        let writer = LogWriter::new(backend.clone());

        let long = LogEntry {
            body: Some("x".repeat(6000)),
            error: Some("e".repeat(1500)),
            ..entry()
        };
        writer.append(&long).await;

        let rows = backend.rows("request_logs").await;
        let body = rows[0]["body"].as_str().unwrap();
        assert!(body.chars().count() <= 5000);
        assert_eq!(rows[0]["error"].as_str().unwrap().len(), 1000);
    }

    #[tokio::test]
    async fn test_append_drops_fields_missing_from_table() {
        let backend = Arc::new(MockBackend::new());
        backend
            .create_table("request_logs", &["id", "timestamp", "method", "endpoint"])
            .await;
        let writer = LogWriter::new(backend.clone());

        writer.append(&entry()).await;

        let rows = backend.rows("request_logs").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 4);
        assert_eq!(rows[0]["method"], json!("GET"));
    }

    #[tokio::test]
    async fn test_append_swallows_backend_errors() {
        let backend = provisioned().await;
        backend.set_unavailable("request_logs", true).await;
        let writer = LogWriter::new(backend.clone());

        // Must not panic or propagate
        writer.append(&entry()).await;

        backend.set_unavailable("request_logs", false).await;
        assert!(backend.rows("request_logs").await.is_empty());
    }

    #[tokio::test]
    async fn test_append_to_missing_table_is_dropped() {
        let backend = Arc::new(MockBackend::new());
        let writer = LogWriter::new(backend.clone());

        writer.append(&entry()).await;

        assert!(backend.rows("request_logs").await.is_empty());
    }
}
