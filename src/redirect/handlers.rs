use axum::{
    extract::{ConnectInfo, Path, State},
    http::{
        header::{self, HeaderMap, HeaderName},
        StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::analytics::ip_extractor::{anonymize_ip, extract_client_ip};
use crate::analytics::GeoResolver;
use crate::api::ApiError;
use crate::config::AnalyticsConfig;
use crate::registry::{LinkRegistry, RegistryError};

pub struct RedirectState {
    pub registry: Arc<LinkRegistry>,
    pub geo_resolver: GeoResolver,
    pub analytics_config: AnalyticsConfig,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Redirect to the target URL, recording the click
pub async fn redirect_short_url(
    State(state): State<Arc<RedirectState>>,
    Path(shortcode): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let handler_start = Instant::now();

    let link = match state.registry.lookup(&shortcode).await {
        Ok(link) => link,
        Err(RegistryError::NotFound(_)) => {
            warn!(%shortcode, "Redirect failed - shortcode not found");
            return Err(ApiError::not_found());
        }
        Err(err) => return Err(err.into()),
    };

    if link.expired {
        warn!(%shortcode, "Redirect failed - URL expired");
        return Err(ApiError::expired());
    }

    let config = &state.analytics_config;
    let mut client_ip = extract_client_ip(&headers, addr.ip(), config);
    if config.ip_anonymization {
        client_ip = anonymize_ip(client_ip);
    }

    // Resolved before touching the registry so lookup latency never sits
    // inside the click-history critical section
    let location = state.geo_resolver.resolve(client_ip);
    let city = location.city.clone();

    match state
        .registry
        .record_click(
            &shortcode,
            client_ip,
            header_str(&headers, &header::USER_AGENT),
            header_str(&headers, &header::REFERER),
            location,
        )
        .await
    {
        Ok(()) => {}
        // Purged between lookup and click; the redirect still stands
        Err(RegistryError::NotFound(_)) => {
            debug!(%shortcode, "link purged before click was recorded");
        }
        Err(err) => {
            warn!(%shortcode, error = %err, "failed to record click");
        }
    }

    info!(
        %shortcode,
        url = %link.target_url,
        ip = %client_ip,
        location = %city,
        handler_ms = handler_start.elapsed().as_millis() as u64,
        "Successful redirect"
    );

    Ok((StatusCode::FOUND, [(header::LOCATION, link.target_url)]).into_response())
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: String,
    }

    Json(HealthResponse {
        status: "OK".to_string(),
    })
}
