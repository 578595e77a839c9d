//! Application assembly and server lifecycle.

use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::analytics::GeoResolver;
use crate::api;
use crate::config::Config;
use crate::redirect;
use crate::registry::LinkRegistry;
use crate::sweeper::{spawn_sweeper, ExpirySweeper};

/// Build the full router: creation and analytics endpoints plus redirects
pub fn create_app(registry: Arc<LinkRegistry>, geo_resolver: GeoResolver, config: &Config) -> Router {
    let api_router = api::create_api_router(Arc::clone(&registry), config.base_url.clone());
    let redirect_router =
        redirect::create_redirect_router(registry, geo_resolver, config.analytics.clone());

    api_router
        .merge(redirect_router)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the service until Ctrl-C
pub async fn run(config: Config) -> Result<()> {
    let geo_resolver = GeoResolver::from_mmdb(config.analytics.geoip_city_db_path.as_deref())?;
    if geo_resolver.has_database() {
        info!("🌍 GeoIP database loaded");
    } else {
        info!("🌍 No GeoIP database configured, public addresses resolve to Unknown");
    }

    let registry = Arc::new(
        LinkRegistry::in_memory().with_default_validity(config.links.default_validity_minutes),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_handle = spawn_sweeper(
        ExpirySweeper::new(Arc::clone(&registry)),
        Duration::from_secs(config.links.sweep_interval_secs),
        shutdown_rx,
    );

    let app = create_app(registry, geo_resolver, &config);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(base_url = %config.base_url, "🚀 Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
    .await?;

    let _ = shutdown_tx.send(true);
    sweeper_handle.await?;

    Ok(())
}
