use chrono::TimeDelta;
use thiserror::Error;
use url::Url;

pub const MIN_SHORTCODE_LEN: usize = 3;
pub const MAX_SHORTCODE_LEN: usize = 10;

/// Caller-correctable input errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid URL format")]
    InvalidUrl,
    #[error("Shortcode must be 3-10 alphanumeric characters")]
    InvalidShortcode,
    #[error("Validity must be a positive number (minutes)")]
    InvalidValidity,
}

/// Accept only absolute URLs
pub fn validate_target_url(raw: &str) -> Result<Url, ValidationError> {
    Url::parse(raw).map_err(|_| ValidationError::InvalidUrl)
}

/// `^[A-Za-z0-9]{3,10}$`
pub fn validate_shortcode(code: &str) -> Result<(), ValidationError> {
    let len_ok = (MIN_SHORTCODE_LEN..=MAX_SHORTCODE_LEN).contains(&code.len());
    if len_ok && code.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidShortcode)
    }
}

/// Convert a validity in (possibly fractional) minutes to a duration.
///
/// Rounds to the millisecond, but never below one: a positive validity
/// must not produce a link that is expired at creation.
pub fn validity_from_minutes(minutes: f64) -> Result<TimeDelta, ValidationError> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(ValidationError::InvalidValidity);
    }

    let millis = (minutes * 60_000.0).round().max(1.0);
    TimeDelta::try_milliseconds(millis as i64).ok_or(ValidationError::InvalidValidity)
}
