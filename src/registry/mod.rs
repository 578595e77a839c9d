//! Short-link registry
//!
//! Owns the mapping from shortcode to link record and click analytics.
//! All state lives behind a [`LinkStore`]; the registry adds validation,
//! shortcode generation, timestamps and expiry evaluation on top of it.

pub mod shortcode;
pub mod validate;

use chrono::TimeDelta;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::analytics::{AnalyticsRecord, ClickRecord, GeoLocation, DIRECT_REFERRER};
use crate::clock::{Clock, SystemClock};
use crate::models::LinkRecord;
use crate::storage::{LinkEntry, LinkStore, MemoryStore, StorageError};

pub use shortcode::{RandomShortcodeGenerator, ShortcodeGenerator};
pub use validate::ValidationError;

pub const DEFAULT_VALIDITY_MINUTES: u32 = 30;

/// Consecutive generation collisions between diagnostic warnings
const COLLISION_WARN_INTERVAL: u32 = 16;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Shortcode '{0}' already exists")]
    Conflict(String),
    #[error("Short URL '{0}' not found")]
    NotFound(String),
    #[error(transparent)]
    Storage(anyhow::Error),
}

impl From<StorageError> for RegistryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict => {
                RegistryError::Storage(anyhow::anyhow!("unexpected short code conflict"))
            }
            StorageError::Other(e) => RegistryError::Storage(e),
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

pub struct LinkRegistry {
    store: Arc<dyn LinkStore>,
    clock: Arc<dyn Clock>,
    generator: Arc<dyn ShortcodeGenerator>,
    default_validity: TimeDelta,
}

impl LinkRegistry {
    pub fn new(store: Arc<dyn LinkStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            generator: Arc::new(RandomShortcodeGenerator),
            default_validity: TimeDelta::minutes(DEFAULT_VALIDITY_MINUTES.into()),
        }
    }

    /// Registry over a fresh in-memory store and the system clock
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock))
    }

    pub fn with_generator(mut self, generator: Arc<dyn ShortcodeGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_default_validity(mut self, minutes: u32) -> Self {
        self.default_validity = TimeDelta::minutes(minutes.into());
        self
    }

    /// Create a short link.
    ///
    /// `shortcode` is generated when omitted; `validity_minutes` falls back to
    /// the registry default. The link and its empty analytics become visible
    /// together or not at all.
    pub async fn create(
        &self,
        target_url: &str,
        shortcode: Option<&str>,
        validity_minutes: Option<f64>,
    ) -> RegistryResult<LinkRecord> {
        validate::validate_target_url(target_url)?;
        if let Some(code) = shortcode {
            validate::validate_shortcode(code)?;
        }
        let validity = match validity_minutes {
            Some(minutes) => validate::validity_from_minutes(minutes)?,
            None => self.default_validity,
        };

        let created_at = self.clock.now();
        let expires_at = created_at
            .checked_add_signed(validity)
            .ok_or(ValidationError::InvalidValidity)?;

        let new_link =
            |code: String| LinkRecord::new(code, target_url.to_string(), created_at, expires_at);

        if let Some(code) = shortcode {
            let link = new_link(code.to_string());
            return match self.store.insert_if_absent(LinkEntry::new(link.clone())).await {
                Ok(()) => Ok(link),
                Err(StorageError::Conflict) => Err(RegistryError::Conflict(code.to_string())),
                Err(err) => Err(err.into()),
            };
        }

        let mut collisions: u32 = 0;
        loop {
            let candidate = self.generator.generate();

            // The existence check is advisory; insert_if_absent is what
            // guarantees uniqueness against concurrent creators.
            if !self.store.contains(&candidate).await? {
                let link = new_link(candidate);
                match self.store.insert_if_absent(LinkEntry::new(link.clone())).await {
                    Ok(()) => {
                        debug!(shortcode = %link.shortcode, collisions, "generated shortcode");
                        return Ok(link);
                    }
                    Err(StorageError::Conflict) => {}
                    Err(err) => return Err(err.into()),
                }
            }

            collisions += 1;
            if collisions % COLLISION_WARN_INTERVAL == 0 {
                warn!(collisions, "shortcode generation keeps colliding");
            }
        }
    }

    /// Fetch a link with its `expired` flag evaluated now. Never purges.
    pub async fn lookup(&self, shortcode: &str) -> RegistryResult<LinkRecord> {
        let link = self
            .store
            .get_link(shortcode)
            .await?
            .ok_or_else(|| RegistryError::NotFound(shortcode.to_string()))?;
        Ok(link.observed_at(self.clock.now()))
    }

    /// Link and analytics for a shortcode. Expired links that have not been
    /// swept yet are still returned.
    pub async fn get_analytics(
        &self,
        shortcode: &str,
    ) -> RegistryResult<(LinkRecord, AnalyticsRecord)> {
        let entry = self
            .store
            .get(shortcode)
            .await?
            .ok_or_else(|| RegistryError::NotFound(shortcode.to_string()))?;
        Ok((entry.link.observed_at(self.clock.now()), entry.analytics))
    }

    /// Append a click to a link's history. Clicks on expired links are
    /// accepted; denying the redirect is the caller's decision.
    pub async fn record_click(
        &self,
        shortcode: &str,
        ip: IpAddr,
        user_agent: Option<&str>,
        referrer: Option<&str>,
        location: GeoLocation,
    ) -> RegistryResult<()> {
        let click = ClickRecord {
            timestamp: self.clock.now(),
            ip,
            user_agent: user_agent.map(str::to_string),
            referrer: referrer
                .filter(|r| !r.is_empty())
                .unwrap_or(DIRECT_REFERRER)
                .to_string(),
            location,
        };

        if self.store.append_click(shortcode, click).await? {
            Ok(())
        } else {
            Err(RegistryError::NotFound(shortcode.to_string()))
        }
    }

    /// True while a record exists, expired or not
    pub async fn shortcode_exists(&self, shortcode: &str) -> RegistryResult<bool> {
        Ok(self.store.contains(shortcode).await?)
    }

    /// Shortcodes whose `expires_at` is at or before now
    pub async fn list_expired(&self) -> RegistryResult<Vec<String>> {
        let now = self.clock.now();
        let mut expired: Vec<String> = self
            .store
            .scan()
            .await?
            .into_iter()
            .filter(|link| link.is_expired_at(now))
            .map(|link| link.shortcode)
            .collect();
        expired.sort_unstable();
        Ok(expired)
    }

    /// Remove links and their analytics. Unknown shortcodes are ignored.
    /// Returns how many entries were removed.
    pub async fn purge<I, S>(&self, shortcodes: I) -> RegistryResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut removed = 0;
        for code in shortcodes {
            if self.store.remove(code.as_ref()).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Like [`purge`](Self::purge), but each entry is removed only if it is
    /// still expired when reached. A shortcode purged and reissued since the
    /// list was taken is left alone.
    pub async fn purge_expired<I, S>(&self, shortcodes: I) -> RegistryResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let now = self.clock.now();
        let mut removed = 0;
        for code in shortcodes {
            if self.store.remove_if_expired(code.as_ref(), now).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
