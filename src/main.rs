//! Landing feeds service: binary entrypoint.
//! Loads config, then hands off to `landing_feeds::build_app`, which installs
//! metrics, kicks off the startup fetch and returns the HTTP router.

use landing_feeds::config::FeedsConfig;
use landing_feeds::feeds::OnlineFlag;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` wins; default is `landing_feeds=info,warn`. `LOG_FORMAT=json`
/// switches to JSON lines. No-op if a subscriber is already installed.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("landing_feeds=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = FeedsConfig::load()?;
    let router = landing_feeds::build_app(&cfg, OnlineFlag::default())?;

    Ok(router.into())
}
