//! HTTP geolocation lookup.
//!
//! GETs a JSON document describing the client address. Works with services
//! answering either `country`/`regionName`/`city` or
//! `country_name`/`region`/`city`.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::interfaces::{GeoError, GeoLocation, GeoLocator};

/// Placeholder replaced by the client address in the endpoint.
pub const IP_PLACEHOLDER: &str = "{ip}";

#[derive(Debug, Deserialize)]
struct GeoResponse {
    status: Option<String>,
    message: Option<String>,
    error: Option<bool>,
    reason: Option<String>,
    country: Option<String>,
    country_name: Option<String>,
    region: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    city: Option<String>,
}

impl GeoResponse {
    fn into_location(self) -> Result<GeoLocation, GeoError> {
        if self.status.as_deref() == Some("fail") {
            return Err(GeoError::Provider(self.message.unwrap_or_default()));
        }
        if self.error == Some(true) {
            return Err(GeoError::Provider(self.reason.unwrap_or_default()));
        }
        Ok(GeoLocation {
            country: self.country_name.or(self.country),
            region: self.region_name.or(self.region),
            city: self.city,
        })
    }
}

/// Geolocation over plain HTTP GET.
pub struct HttpGeoLocator {
    client: Client,
    endpoint: String,
}

impl HttpGeoLocator {
    /// Create a locator for `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GeoError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn url_for(&self, ip: IpAddr) -> String {
        self.endpoint.replace(IP_PLACEHOLDER, &ip.to_string())
    }
}

#[async_trait]
impl GeoLocator for HttpGeoLocator {
    async fn locate(&self, ip: IpAddr) -> Result<GeoLocation, GeoError> {
        let url = self.url_for(ip);
        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                GeoError::Timeout
            } else {
                GeoError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status(status.as_u16()));
        }

        let body: GeoResponse = response.json().await?;
        debug!(%ip, "Geolocation lookup succeeded");
        body.into_location()
    }
}
