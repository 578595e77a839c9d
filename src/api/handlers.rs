use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::ApiError;
use crate::models::{AnalyticsResponse, CreateLinkRequest, CreateLinkResponse};
use crate::registry::{LinkRegistry, RegistryError};

pub struct AppState {
    pub registry: Arc<LinkRegistry>,
    /// Origin prepended to shortcodes in creation responses
    pub base_url: String,
}

/// Create a new short URL
pub async fn create_short_url(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateLinkResponse>), ApiError> {
    let Json(payload) = payload?;

    let Some(url) = payload.url.filter(|u| !u.trim().is_empty()) else {
        warn!("URL creation failed - missing URL");
        return Err(ApiError::bad_request("URL is required"));
    };

    // An empty shortcode means "generate one"
    let shortcode = payload.shortcode.as_deref().filter(|s| !s.is_empty());

    let link = match state
        .registry
        .create(&url, shortcode, payload.validity)
        .await
    {
        Ok(link) => link,
        Err(err) => {
            match &err {
                RegistryError::Validation(reason) => {
                    warn!(%url, ?shortcode, validity = ?payload.validity, %reason, "URL creation failed");
                }
                RegistryError::Conflict(code) => {
                    warn!(shortcode = %code, "URL creation failed - shortcode already exists");
                }
                _ => {}
            }
            return Err(err.into());
        }
    };

    info!(
        shortcode = %link.shortcode,
        url = %link.target_url,
        expiry_time = %link.expires_at,
        "URL created successfully"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateLinkResponse::from_record(link, &state.base_url)),
    ))
}

/// Get click analytics for a short URL
pub async fn get_url_analytics(
    State(state): State<Arc<AppState>>,
    Path(shortcode): Path<String>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let (link, analytics) = state.registry.get_analytics(&shortcode).await.map_err(|err| {
        if matches!(err, RegistryError::NotFound(_)) {
            warn!(%shortcode, "Analytics request failed - shortcode not found");
        }
        ApiError::from(err)
    })?;

    info!(%shortcode, clicks = analytics.click_count(), "Analytics retrieved");

    Ok(Json(AnalyticsResponse::new(link, analytics)))
}
