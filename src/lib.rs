// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod feeds;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::FeedsConfig;
pub use crate::error::FetchError;
pub use crate::feeds::{LandingProvider, LandingSnapshot, OnlineFlag};

use std::sync::Arc;

use shuttle_axum::axum::Router;

use crate::feeds::scheduler::spawn_refresh_scheduler;
use crate::metrics::Metrics;

/// Assemble the service. The Prometheus recorder is installed before any
/// fetch runs; then the startup fetch and the optional background refresh
/// are spawned. Must be called from inside a tokio runtime, once per process.
pub fn build_app(cfg: &FeedsConfig, online: OnlineFlag) -> anyhow::Result<Router> {
    let metrics = Metrics::init()?;

    let provider = Arc::new(LandingProvider::from_config(cfg, Arc::new(online))?);

    let startup = provider.clone();
    tokio::spawn(async move {
        let freshness = startup.start().await;
        tracing::info!(?freshness, "landing provider started");
    });

    if let Some(every) = cfg.background_refresh() {
        spawn_refresh_scheduler(provider.clone(), every);
    }

    Ok(api::create_router(AppState { provider }).merge(metrics.router()))
}
