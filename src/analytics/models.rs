//! Data models for click analytics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Placeholder used for every field of a local or unresolved location
pub const LOCAL_MARKER: &str = "Local";
pub const UNKNOWN_MARKER: &str = "Unknown";

/// Referrer recorded when a click arrives without a `Referer` header
pub const DIRECT_REFERRER: &str = "Direct";

/// Coarse geographic location derived from a client IP address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Country (ISO code when the database provides one)
    pub country: String,

    /// Region/state/province
    pub region: String,

    /// City name
    pub city: String,

    /// IANA time zone, only present for database hits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl GeoLocation {
    /// Descriptor for loopback and private-range addresses
    pub fn local() -> Self {
        Self::filled(LOCAL_MARKER)
    }

    /// Descriptor for addresses the database knows nothing about
    pub fn unknown() -> Self {
        Self::filled(UNKNOWN_MARKER)
    }

    fn filled(marker: &str) -> Self {
        Self {
            country: marker.to_string(),
            region: marker.to_string(),
            city: marker.to_string(),
            timezone: None,
        }
    }
}

impl Default for GeoLocation {
    fn default() -> Self {
        Self::unknown()
    }
}

/// One redirect event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickRecord {
    pub timestamp: DateTime<Utc>,
    pub ip: IpAddr,
    pub user_agent: Option<String>,
    pub referrer: String,
    pub location: GeoLocation,
}

/// Click analytics owned by a single link.
///
/// The count and the history only change together through [`AnalyticsRecord::record`],
/// so `click_count() == click_history().len()` holds for every observer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRecord {
    click_count: u64,
    click_history: Vec<ClickRecord>,
}

impl AnalyticsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, click: ClickRecord) {
        self.click_history.push(click);
        self.click_count += 1;
    }

    pub fn click_count(&self) -> u64 {
        self.click_count
    }

    pub fn click_history(&self) -> &[ClickRecord] {
        &self.click_history
    }

    pub fn into_history(self) -> Vec<ClickRecord> {
        self.click_history
    }
}
