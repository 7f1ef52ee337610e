// src/lib.rs
// Public library surface for integration tests (and the binary).

pub mod ai_bootstrap;
pub mod alignment;
pub mod api;
pub mod config;
pub mod distance;
pub mod error;
pub mod metrics;
pub mod report;
pub mod scoring;
pub mod signals;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::alignment::{AlignmentEvaluator, AlignmentJudge, AlignmentVerdict};
pub use crate::api::router;
pub use crate::distance::{distance_penalty, extract_distance};
pub use crate::report::RankingReport;
pub use crate::scoring::{rank_providers, review_score, ScoringEngine};
pub use crate::types::{ProviderId, ProviderRecord, ScoreRecord, SignalSummary};

use axum::Router;
use tracing::{info, warn};

use crate::config::RankerConfig;

/// Build the full in-process app: config, judge, engine, routes and (when a
/// recorder could be installed) `/metrics`.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = RankerConfig::load_default()?;
    let engine = ScoringEngine::from_config(&cfg);
    info!(
        judge = engine.alignment().judge_name(),
        alignment_enabled = cfg.alignment.enabled,
        "ranker app configured"
    );

    let mut router = api::router(api::AppState::new(engine));
    match metrics::Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => warn!(error = %e, "metrics recorder not installed; /metrics disabled"),
    }
    Ok(router)
}

/// Call this from the Shuttle entrypoint (after tracing init) to perform a
/// one-off alignment judgment. It won't panic on failure; it just logs.
pub async fn run_alignment_quick_probe() -> anyhow::Result<()> {
    let rt = ai_bootstrap::AlignmentRuntime::from_config(RankerConfig::load_default()?);
    rt.quick_probe().await;
    info!("alignment quick probe finished");
    Ok(())
}
