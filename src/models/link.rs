use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::analytics::{AnalyticsRecord, ClickRecord};

/// A shortened link as held by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub id: Uuid,
    pub shortcode: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Derived from `expires_at`; refreshed by the registry on every read.
    pub expired: bool,
}

impl LinkRecord {
    pub fn new(
        shortcode: String,
        target_url: String,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            shortcode,
            target_url,
            created_at,
            expires_at,
            expired: false,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Return the record with its `expired` flag computed against `now`.
    pub fn observed_at(mut self, now: DateTime<Utc>) -> Self {
        self.expired = self.is_expired_at(now);
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub url: Option<String>,
    pub shortcode: Option<String>,
    /// Validity in minutes
    #[serde(default, deserialize_with = "deserialize_minutes")]
    pub validity: Option<f64>,
}

/// Minutes as a JSON number or a numeric string. Text that is not a number
/// becomes NaN so the registry rejects it as an invalid validity.
fn deserialize_minutes<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Minutes {
        Number(f64),
        Text(String),
    }

    Ok(Option::<Minutes>::deserialize(deserializer)?.map(|minutes| match minutes {
        Minutes::Number(value) => value,
        Minutes::Text(text) => text.trim().parse().unwrap_or(f64::NAN),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkResponse {
    pub short_link: String,
    pub shortcode: String,
    pub url: String,
    pub expiry_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl CreateLinkResponse {
    pub fn from_record(link: LinkRecord, base_url: &str) -> Self {
        Self {
            short_link: format!("{}/{}", base_url.trim_end_matches('/'), link.shortcode),
            shortcode: link.shortcode,
            url: link.target_url,
            expiry_time: link.expires_at,
            created_at: link.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub shortcode: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub expiry_time: DateTime<Utc>,
    pub is_expired: bool,
    pub clicks: u64,
    pub click_history: Vec<ClickRecord>,
}

impl AnalyticsResponse {
    pub fn new(link: LinkRecord, analytics: AnalyticsRecord) -> Self {
        let clicks = analytics.click_count();
        Self {
            shortcode: link.shortcode,
            url: link.target_url,
            created_at: link.created_at,
            expiry_time: link.expires_at,
            is_expired: link.expired,
            clicks,
            click_history: analytics.into_history(),
        }
    }
}
