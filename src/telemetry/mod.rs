//! Request telemetry pipeline.
//!
//! Turns a finished request into a request-log entry on a detached task:
//! client address extraction, a time-bounded geolocation lookup, then one
//! append through the [`LogWriter`]. The request path never awaits any of
//! it, and nothing here is retried.

pub mod client_addr;
pub mod geo;

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::HeaderMap;
use tokio::task::JoinHandle;
use tracing::warn;

pub use client_addr::{classify, client_address, AddressKind};
pub use geo::HttpGeoLocator;

use crate::config::TelemetryConfig;
use crate::interfaces::{Backend, GeoError, GeoLocation, GeoLocator};
use crate::repository::{LogEntry, LogWriter};

/// Everything telemetry needs from a finished request, owned so the
/// background task holds nothing the request still uses.
#[derive(Debug, Clone, Default)]
pub struct RequestLog {
    pub method: String,
    pub endpoint: String,
    pub headers: HeaderMap,
    pub user_id: Option<String>,
    pub status_code: Option<u16>,
    pub elapsed: Option<Duration>,
    pub body: Option<String>,
    pub error: Option<String>,
}

impl RequestLog {
    pub fn new(method: impl Into<String>, endpoint: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            method: method.into(),
            endpoint: endpoint.into(),
            headers,
            ..Default::default()
        }
    }
}

/// Captures the start of a request; [`finish`](Self::finish) yields the log.
#[derive(Debug)]
pub struct RequestTimer {
    log: RequestLog,
    started: Instant,
}

impl RequestTimer {
    pub fn start(method: impl Into<String>, endpoint: impl Into<String>, headers: &HeaderMap) -> Self {
        Self {
            log: RequestLog::new(method, endpoint, headers.clone()),
            started: Instant::now(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.log.user_id = Some(user_id.into());
        self
    }

    /// Stop the clock. Called on success and on handler error alike.
    pub fn finish(self, status_code: Option<u16>, body: Option<String>, error: Option<String>) -> RequestLog {
        RequestLog {
            status_code,
            elapsed: Some(self.started.elapsed()),
            body,
            error,
            ..self.log
        }
    }
}

/// Detached request-log enrichment.
#[derive(Clone)]
pub struct RequestTelemetry {
    writer: Arc<LogWriter>,
    locator: Arc<dyn GeoLocator>,
    config: TelemetryConfig,
}

impl RequestTelemetry {
    pub fn new(backend: Arc<dyn Backend>, locator: Arc<dyn GeoLocator>, config: TelemetryConfig) -> Self {
        let writer = LogWriter::new(backend).with_limits(config.body_limit, config.error_limit);
        Self {
            writer: Arc::new(writer),
            locator,
            config,
        }
    }

    /// Build the pipeline with an [`HttpGeoLocator`] for the configured endpoint.
    pub fn from_config(backend: Arc<dyn Backend>, config: &TelemetryConfig) -> Result<Self, GeoError> {
        let locator = HttpGeoLocator::new(config.geo_endpoint.clone(), config.lookup_timeout())?;
        Ok(Self::new(backend, Arc::new(locator), config.clone()))
    }

    pub fn log_writer(&self) -> &LogWriter {
        &self.writer
    }

    /// Schedule a log entry for `request` and return immediately.
    ///
    /// The returned handle exists for tests and shutdown hooks; request
    /// handlers drop it. Returns `None` when telemetry is disabled or no
    /// tokio runtime is running.
    pub fn log_request(&self, request: RequestLog) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            return None;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(endpoint = %request.endpoint, "No async runtime, dropping request log");
            return None;
        };

        let pipeline = self.clone();
        Some(runtime.spawn(async move {
            let entry = pipeline.assemble(request).await;
            pipeline.writer.append(&entry).await;
        }))
    }

    /// Build the entry. Body and error caps are applied by the writer.
    async fn assemble(&self, request: RequestLog) -> LogEntry {
        let ip = client_address(&request.headers);
        let location = self.locate(&ip).await;
        let user_agent = request
            .headers
            .get(http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        LogEntry {
            user_id: request.user_id,
            user_agent,
            country: location.country,
            region: location.region,
            city: location.city,
            status_code: request.status_code,
            latency_ms: request
                .elapsed
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            body: request.body,
            error: request.error,
            ..LogEntry::new(request.method, request.endpoint, ip)
        }
    }

    async fn locate(&self, address: &str) -> GeoLocation {
        let ip = match classify(address) {
            AddressKind::Local => return GeoLocation::local(),
            AddressKind::Unknown => return GeoLocation::default(),
            AddressKind::Public(ip) => ip,
        };

        let lookup = tokio::time::timeout(self.config.lookup_timeout(), self.locator.locate(ip));
        let result = match lookup.await {
            Ok(result) => result,
            Err(_) => Err(GeoError::Timeout),
        };
        match result {
            Ok(location) => location,
            Err(e) => {
                warn!(%ip, error = %e, "Geolocation unavailable, logging without location");
                GeoLocation::default()
            }
        }
    }
}
