//! Clubhouse facade for in-process library usage.
//!
//! Bundles the snapshot reader and writer, the request-log writer and the
//! telemetry pipeline over one backend.
//!
//! # Example
//!
//! ```ignore
//! use clubhouse::config::Config;
//! use clubhouse::facade::Clubhouse;
//!
//! let config = Config::load(None)?;
//! let clubhouse = Clubhouse::open(&config).await?;
//!
//! let snapshot = clubhouse.read(None).await;
//! clubhouse.write(&snapshot).await?;
//! ```

use std::sync::Arc;

use crate::config::{Config, TelemetryConfig};
use crate::interfaces::{Backend, GeoError, GeoLocator, StorageError};
use crate::repository::{LogEntry, Snapshot, SnapshotReader, SnapshotWriter, WriteOutcome};
use crate::telemetry::{RequestLog, RequestTelemetry};
use crate::utils::bootstrap;

/// Main clubhouse instance for library usage.
#[derive(Clone)]
pub struct Clubhouse {
    backend: Arc<dyn Backend>,
    reader: SnapshotReader,
    writer: SnapshotWriter,
    telemetry: RequestTelemetry,
}

impl Clubhouse {
    /// Select the configured backend for this process and build on it.
    ///
    /// Only one call per process succeeds; the backend choice is fixed
    /// afterwards.
    pub async fn open(config: &Config) -> Result<Self, ClubhouseError> {
        let backend = bootstrap::select_configured_backend(config).await?;
        let telemetry = RequestTelemetry::from_config(backend.clone(), &config.telemetry)?;
        Ok(Self::assemble(backend, telemetry))
    }

    /// Build on an existing backend without touching the process-wide
    /// selection.
    pub fn with_backend(
        backend: Arc<dyn Backend>,
        telemetry: TelemetryConfig,
        locator: Arc<dyn GeoLocator>,
    ) -> Self {
        let pipeline = RequestTelemetry::new(backend.clone(), locator, telemetry);
        Self::assemble(backend, pipeline)
    }

    fn assemble(backend: Arc<dyn Backend>, telemetry: RequestTelemetry) -> Self {
        Self {
            reader: SnapshotReader::new(backend.clone()),
            writer: SnapshotWriter::new(backend.clone()),
            backend,
            telemetry,
        }
    }

    /// Read the named collections, or all registered ones.
    pub async fn read(&self, names: Option<&[&str]>) -> Snapshot {
        self.reader.read(names).await
    }

    /// Replace the stored contents of every registered collection in the
    /// snapshot.
    pub async fn write(&self, snapshot: &Snapshot) -> Result<WriteOutcome, ClubhouseError> {
        Ok(self.writer.write(snapshot).await?)
    }

    /// Append a single request-log entry, waiting for the append.
    pub async fn append_log_entry(&self, entry: &LogEntry) {
        self.telemetry.log_writer().append(entry).await;
    }

    /// Hand a finished request to the background telemetry pipeline.
    pub fn log_request(&self, request: RequestLog) -> Option<tokio::task::JoinHandle<()>> {
        self.telemetry.log_request(request)
    }

    pub fn telemetry(&self) -> &RequestTelemetry {
        &self.telemetry
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }
}

/// Errors from Clubhouse operations.
#[derive(Debug, thiserror::Error)]
pub enum ClubhouseError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Geolocation client error: {0}")]
    Geo(#[from] GeoError),
}
