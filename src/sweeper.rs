//! Expiry sweeping
//!
//! [`ExpirySweeper`] holds no state of its own: each call to `sweep`
//! purges whatever the registry reports as expired at that instant,
//! re-checking expiry per entry at removal time.
//! [`spawn_sweeper`] is the clock that drives it.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::registry::{LinkRegistry, RegistryResult};

#[derive(Clone)]
pub struct ExpirySweeper {
    registry: Arc<LinkRegistry>,
}

impl ExpirySweeper {
    pub fn new(registry: Arc<LinkRegistry>) -> Self {
        Self { registry }
    }

    /// Purge every link expired at call time. Returns the number removed.
    pub async fn sweep(&self) -> RegistryResult<usize> {
        let expired = self.registry.list_expired().await?;
        if expired.is_empty() {
            debug!("No expired links to clean up");
            return Ok(0);
        }

        let removed = self.registry.purge_expired(&expired).await?;
        info!(count = removed, shortcodes = ?expired, "Cleaned up expired URLs");
        Ok(removed)
    }
}

/// Run `sweeper` every `interval` until `shutdown` flips to true
pub fn spawn_sweeper(
    sweeper: ExpirySweeper,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        // Skip the first tick which fires immediately
        ticker.tick().await;

        info!(interval_secs = interval.as_secs(), "Cleanup service started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = sweeper.sweep().await {
                        error!("Failed to sweep expired links: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Cleanup service shutting down");
                        break;
                    }
                }
            }
        }
    })
}
