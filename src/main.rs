//! Provider Ranker: binary entrypoint
//! Boots the Axum HTTP server with the ranking routes and shared engine.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - RANKER_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("RANKER_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("provider_ranker=info,ranking=info,warn"));

    // The runtime may already have installed a subscriber; keep it then.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    if let Err(e) = provider_ranker::run_alignment_quick_probe().await {
        tracing::warn!(error = ?e, "alignment quick probe didn't run");
    }

    let router = provider_ranker::app().await?;
    Ok(router.into())
}
