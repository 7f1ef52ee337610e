use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static METRICS: OnceCell<Metrics> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder once per process and describe the
    /// ranking series. Later calls return the same handle.
    pub fn init() -> anyhow::Result<Self> {
        METRICS
            .get_or_try_init(|| -> anyhow::Result<Metrics> {
                let handle = PrometheusBuilder::new().install_recorder()?;
                describe();
                Ok(Metrics { handle })
            })
            .cloned()
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("ranking_requests_total", "Ranking calls.");
    describe_counter!(
        "ranking_providers_scored_total",
        "Providers that received a score."
    );
    describe_counter!(
        "ranking_providers_unmatched_total",
        "Providers skipped for lack of a signal summary."
    );
    describe_counter!(
        "alignment_judgments_total",
        "Alignment answers by parsed verdict."
    );
    describe_counter!(
        "alignment_fallbacks_total",
        "Alignment calls that degraded to the neutral multiplier."
    );
    describe_counter!(
        "alignment_cache_hits_total",
        "Providers whose specialty was already judged in the batch."
    );
    describe_histogram!("ranking_duration_ms", "Ranking wall time in milliseconds.");
}
