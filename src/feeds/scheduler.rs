// src/feeds/scheduler.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::feeds::provider::{LandingProvider, RefreshOutcome};

/// Periodically refresh the landing feeds. The immediate first tick is skipped;
/// `start()` already covers startup.
pub fn spawn_refresh_scheduler(provider: Arc<LandingProvider>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match provider.refresh_all().await {
                RefreshOutcome::Completed { succeeded, failed } => {
                    tracing::info!(target: "scheduler", succeeded, failed, "scheduled landing refresh");
                }
                RefreshOutcome::Skipped { reason } => {
                    tracing::debug!(target: "scheduler", ?reason, "scheduled refresh skipped");
                }
            }
        }
    })
}
