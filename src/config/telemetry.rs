//! Request telemetry configuration.

use std::time::Duration;

use serde::Deserialize;

/// Request telemetry configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// When false, `log_request` does nothing.
    pub enabled: bool,
    /// Geolocation endpoint; `{ip}` is replaced by the client address.
    pub geo_endpoint: String,
    /// Hard bound on a single geolocation lookup.
    pub lookup_timeout_ms: u64,
    /// Maximum stored request body, in characters.
    pub body_limit: usize,
    /// Maximum stored error text, in characters.
    pub error_limit: usize,
}

impl TelemetryConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            geo_endpoint: "http://ip-api.com/json/{ip}".to_string(),
            lookup_timeout_ms: 2000,
            body_limit: 5000,
            error_limit: 1000,
        }
    }
}
