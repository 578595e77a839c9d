//! Click analytics module
//!
//! This module provides the click analytics data model, GeoIP resolution
//! of visitor addresses and client IP extraction from request headers.
//!
//! Geolocation never fails the caller: a missing database or a lookup
//! miss degrades to an "Unknown" location.

pub mod geoip;
pub mod ip_extractor;
pub mod models;

// Re-export commonly used types
pub use geoip::{GeoDatabase, GeoResolver, MaxMindDatabase};
pub use ip_extractor::extract_client_ip;
pub use models::{AnalyticsRecord, ClickRecord, GeoLocation, DIRECT_REFERRER};
