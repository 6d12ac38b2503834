//! Geolocation lookup interface.

use std::net::IpAddr;

use async_trait::async_trait;
use serde::Deserialize;

/// Errors from a geolocation lookup. Telemetry always recovers from these.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("Lookup timed out")]
    Timeout,

    #[error("Lookup returned HTTP {0}")]
    Status(u16),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider rejected lookup: {0}")]
    Provider(String),
}

/// Coarse location of a client address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GeoLocation {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

impl GeoLocation {
    /// Location recorded for loopback and private-range clients.
    pub fn local() -> Self {
        Self {
            country: Some("Local".to_string()),
            region: Some("Local".to_string()),
            city: Some("Local".to_string()),
        }
    }

    /// True when no field is known.
    pub fn is_empty(&self) -> bool {
        self.country.is_none() && self.region.is_none() && self.city.is_none()
    }
}

/// Resolves a client address to a location.
///
/// Implementations:
/// - `HttpGeoLocator`: external JSON lookup service
#[async_trait]
pub trait GeoLocator: Send + Sync {
    async fn locate(&self, ip: IpAddr) -> Result<GeoLocation, GeoError>;
}
