use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::registry::LinkRegistry;

use super::handlers::{create_short_url, get_url_analytics, AppState};

pub fn create_api_router(registry: Arc<LinkRegistry>, base_url: String) -> Router {
    let state = Arc::new(AppState { registry, base_url });

    Router::new()
        .route("/shorturls", post(create_short_url))
        .route("/shorturls/{shortcode}", get(get_url_analytics))
        .with_state(state)
}
