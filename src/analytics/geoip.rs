//! GeoIP resolution of visitor addresses
//!
//! Lookups go through the [`GeoDatabase`] trait; the production
//! implementation reads a memory-mapped MaxMind GeoLite2/GeoIP2 City
//! database. Loopback and private addresses never reach the database.

use anyhow::{Context, Result};
use maxminddb::{geoip2, Mmap, Reader};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

use crate::analytics::models::{GeoLocation, UNKNOWN_MARKER};

/// Source of geolocation data
pub trait GeoDatabase: Send + Sync {
    /// Look up an address. `Ok(None)` means the database has no entry for it.
    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoLocation>>;
}

/// MaxMind City database backed by a memory map
pub struct MaxMindDatabase {
    reader: Reader<Mmap>,
}

impl MaxMindDatabase {
    /// Open a GeoLite2-City or GeoIP2-City .mmdb file
    pub fn open(path: &str) -> Result<Self> {
        let reader = unsafe { Reader::open_mmap(path) }
            .with_context(|| format!("Failed to open GeoIP City database at {}", path))?;
        Ok(Self { reader })
    }
}

impl GeoDatabase for MaxMindDatabase {
    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoLocation>> {
        let result = self.reader.lookup(ip)?;

        match result.decode::<geoip2::City>() {
            Ok(Some(city)) => return Ok(Some(location_from_city(&city))),
            Ok(None) => {}
            Err(err) => debug!(%ip, error = %err, "city record unreadable, trying country"),
        }

        // Country-level databases, or City records without city data
        let country = result.decode::<geoip2::Country>()?;
        Ok(country.map(|country| location_from_country(&country)))
    }
}

fn location_from_city(city: &geoip2::City) -> GeoLocation {
    let region = city
        .subdivisions
        .first()
        .and_then(|subdivision| subdivision.names.english);

    location_from_parts(
        city.country.iso_code.or(city.country.names.english),
        region,
        city.city.names.english,
        city.location.time_zone,
    )
}

fn location_from_country(country: &geoip2::Country) -> GeoLocation {
    location_from_parts(
        country.country.iso_code.or(country.country.names.english),
        None,
        None,
        None,
    )
}

/// Country prefers the ISO code over the English name; missing fields are "Unknown"
fn location_from_parts(
    country: Option<&str>,
    region: Option<&str>,
    city: Option<&str>,
    timezone: Option<&str>,
) -> GeoLocation {
    let or_unknown = |value: Option<&str>| value.unwrap_or(UNKNOWN_MARKER).to_string();

    GeoLocation {
        country: or_unknown(country),
        region: or_unknown(region),
        city: or_unknown(city),
        timezone: timezone.map(str::to_string),
    }
}

/// Maps client addresses to coarse locations.
///
/// Cheap to clone; the database handle is shared.
#[derive(Clone, Default)]
pub struct GeoResolver {
    database: Option<Arc<dyn GeoDatabase>>,
}

impl GeoResolver {
    pub fn new(database: Arc<dyn GeoDatabase>) -> Self {
        Self {
            database: Some(database),
        }
    }

    /// Resolver without a database: every public address is "Unknown"
    pub fn without_database() -> Self {
        Self::default()
    }

    /// Build a resolver from an optional MMDB path
    pub fn from_mmdb(city_path: Option<&str>) -> Result<Self> {
        match city_path {
            Some(path) => Ok(Self::new(Arc::new(MaxMindDatabase::open(path)?))),
            None => Ok(Self::without_database()),
        }
    }

    pub fn has_database(&self) -> bool {
        self.database.is_some()
    }

    /// Resolve an address to a location. Never fails.
    pub fn resolve(&self, ip: IpAddr) -> GeoLocation {
        if is_local_address(ip) {
            return GeoLocation::local();
        }

        let Some(database) = self.database.as_ref() else {
            return GeoLocation::unknown();
        };

        match database.lookup(ip) {
            Ok(Some(location)) => location,
            Ok(None) => GeoLocation::unknown(),
            Err(err) => {
                debug!(%ip, error = %err, "geoip lookup failed");
                GeoLocation::unknown()
            }
        }
    }

    /// Resolve a textual address; unparseable input is "Unknown"
    pub fn resolve_str(&self, ip: &str) -> GeoLocation {
        match ip.trim().parse::<IpAddr>() {
            Ok(ip) => self.resolve(ip),
            Err(_) => GeoLocation::unknown(),
        }
    }
}

/// Loopback (v4 or v6) or inside 10.0.0.0/8 or 192.168.0.0/16.
/// IPv4-mapped IPv6 addresses are judged by their IPv4 form.
pub fn is_local_address(ip: IpAddr) -> bool {
    match ip.to_canonical() {
        IpAddr::V4(v4) => {
            let [a, b, _, _] = v4.octets();
            v4.is_loopback() || a == 10 || (a == 192 && b == 168)
        }
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}
