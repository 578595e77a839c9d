use axum::{routing::get, Router};
use std::sync::Arc;

use crate::analytics::GeoResolver;
use crate::config::AnalyticsConfig;
use crate::registry::LinkRegistry;

use super::handlers::{health_check, redirect_short_url, RedirectState};

pub fn create_redirect_router(
    registry: Arc<LinkRegistry>,
    geo_resolver: GeoResolver,
    analytics_config: AnalyticsConfig,
) -> Router {
    let state = Arc::new(RedirectState {
        registry,
        geo_resolver,
        analytics_config,
    });

    Router::new()
        .route("/", get(health_check))
        .route("/{shortcode}", get(redirect_short_url))
        .with_state(state)
}
