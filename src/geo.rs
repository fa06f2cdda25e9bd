//! Geo-location lookup
//!
//! Narrow adapter over an external IP lookup service. Failures never reach
//! the caller: `resolve_location` turns every error into the placeholder.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use serde::Deserialize;

use crate::error::GeoError;
use crate::models::UNKNOWN_LOCATION;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLocation {
    pub city: String,
    pub country: String,
}

impl std::fmt::Display for GeoLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.city.is_empty(), self.country.is_empty()) {
            (false, false) => write!(f, "{}, {}", self.city, self.country),
            (true, false) => write!(f, "{}", self.country),
            (false, true) => write!(f, "{}", self.city),
            (true, true) => write!(f, "{}", UNKNOWN_LOCATION),
        }
    }
}

#[axum::async_trait]
pub trait GeoLocator: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> Result<GeoLocation, GeoError>;
}

/// Resolve a display location, falling back to "Unknown" on any failure
pub async fn resolve_location(geo: &dyn GeoLocator, ip: Option<IpAddr>) -> String {
    let Some(ip) = ip else {
        return UNKNOWN_LOCATION.to_string();
    };
    if !is_routable(&ip) {
        return UNKNOWN_LOCATION.to_string();
    }
    match geo.lookup(ip).await {
        Ok(location) => location.to_string(),
        Err(e) => {
            tracing::debug!(%ip, error = %e, "Geo lookup failed, using placeholder");
            UNKNOWN_LOCATION.to_string()
        }
    }
}

// ============================================================================
// HTTP LOOKUP (ip-api.com compatible)
// ============================================================================

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    city: Option<String>,
    country: Option<String>,
}

pub struct HttpGeoLocator {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGeoLocator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[axum::async_trait]
impl GeoLocator for HttpGeoLocator {
    async fn lookup(&self, ip: IpAddr) -> Result<GeoLocation, GeoError> {
        if !is_routable(&ip) {
            return Err(GeoError::NonRoutable);
        }

        let url = format!("{}/json/{}", self.base_url, ip);
        let response: IpApiResponse = self.client
            .get(&url)
            .query(&[("fields", "status,message,city,country")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status != "success" {
            return Err(GeoError::NoMatch(response.message.unwrap_or(response.status)));
        }

        Ok(GeoLocation {
            city: response.city.unwrap_or_default(),
            country: response.country.unwrap_or_default(),
        })
    }
}

/// Used when no lookup service is configured
pub struct DisabledGeoLocator;

#[axum::async_trait]
impl GeoLocator for DisabledGeoLocator {
    async fn lookup(&self, _ip: IpAddr) -> Result<GeoLocation, GeoError> {
        Err(GeoError::Disabled)
    }
}

// ============================================================================
// ROUTABILITY
// ============================================================================

/// Private, loopback, link-local and similar addresses have no location
pub fn is_routable(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_routable_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_routable_v4(&v4),
            None => is_routable_v6(v6),
        },
    }
}

fn is_routable_v4(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();
    let shared = octets[0] == 100 && (octets[1] & 0xc0) == 64; // 100.64.0.0/10
    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast()
        || shared)
}

fn is_routable_v6(ip: &Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;
    !(ip.is_loopback() || ip.is_unspecified() || ip.is_multicast() || unique_local || link_local)
}
