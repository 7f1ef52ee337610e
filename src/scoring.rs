// src/scoring.rs
//! Composite provider scoring and ranking.
//!
//! ```text
//! review_score   = min(1, ln(1 + reviews) / ln(1 + 50)) * 10
//! distance_score = distance_penalty(miles)              (0..=10)
//! base_score     = 0.5 * sentiment + 0.3 * review_score + 0.2 * distance_score
//! final_score    = round(base_score * alignment_multiplier, 2)
//! ```
//!
//! The synchronous core ([`rank_providers`]) is pure: it takes precomputed
//! alignment multipliers and never touches the network. [`ScoringEngine`]
//! adds the async alignment step, logging and metrics around it.

use metrics::{counter, histogram};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::alignment::{anon_hash, AlignmentEvaluator, NEUTRAL_MULTIPLIER};
use crate::config::RankerConfig;
use crate::distance::{distance_penalty, resolve_distance, round2};
use crate::report::RankingReport;
use crate::types::{ProviderRecord, ScoreRecord, SignalSummary};

pub const SENTIMENT_WEIGHT: f64 = 0.5;
pub const REVIEW_WEIGHT: f64 = 0.3;
pub const DISTANCE_WEIGHT: f64 = 0.2;

/// Review count at which the review score saturates.
pub const REVIEW_SATURATION: u32 = 50;

/// Log-compressed review volume in `0.0..=10.0`.
pub fn review_score(review_count: u32) -> f64 {
    let ratio = (1.0 + review_count as f64).ln() / (1.0 + REVIEW_SATURATION as f64).ln();
    ratio.min(1.0) * 10.0
}

/// Weighted sum before the alignment multiplier.
pub fn base_score(sentiment: f64, review_score: f64, distance_score: f64) -> f64 {
    SENTIMENT_WEIGHT * sentiment + REVIEW_WEIGHT * review_score + DISTANCE_WEIGHT * distance_score
}

/// Score one joined provider/summary pair.
pub fn score_provider(
    provider: &ProviderRecord,
    summary: &SignalSummary,
    alignment_multiplier: f64,
) -> ScoreRecord {
    let distance_miles = resolve_distance(&provider.address);
    let review_score = review_score(summary.review_count);
    let distance_score = distance_penalty(distance_miles);
    let base = base_score(summary.sentiment, review_score, distance_score);

    ScoreRecord {
        id: provider.id.clone(),
        name: provider.name.clone(),
        final_score: round2(base * alignment_multiplier),
        sentiment: summary.sentiment,
        review_count: summary.review_count,
        review_score,
        distance_miles,
        distance_score,
        alignment_multiplier,
    }
}

/// Outcome of joining providers to their summaries.
#[derive(Debug)]
pub struct Joined<'a> {
    /// `(provider index, provider, summary)` in provider order.
    pub pairs: Vec<(usize, &'a ProviderRecord, &'a SignalSummary)>,
    /// Indices of providers without a summary.
    pub unmatched: Vec<usize>,
}

/// Pair each provider with at most one summary.
///
/// When both sides carry an id the id decides; otherwise exact,
/// case-sensitive name equality. The first eligible summary wins.
pub fn join_signals<'a>(
    providers: &'a [ProviderRecord],
    summaries: &'a [SignalSummary],
) -> Joined<'a> {
    let mut by_id: HashMap<&str, &SignalSummary> = HashMap::new();
    let mut by_name: HashMap<&str, Vec<&SignalSummary>> = HashMap::new();
    for s in summaries {
        if let Some(id) = &s.id {
            by_id.entry(id.0.as_str()).or_insert(s);
        }
        by_name.entry(s.name.as_str()).or_default().push(s);
    }

    let mut pairs = Vec::new();
    let mut unmatched = Vec::new();
    for (idx, p) in providers.iter().enumerate() {
        let via_id = p.id.as_ref().and_then(|id| by_id.get(id.0.as_str()).copied());
        let found = via_id.or_else(|| {
            by_name.get(p.name.as_str()).and_then(|cands| {
                cands
                    .iter()
                    .copied()
                    .find(|s| p.id.is_none() || s.id.is_none())
            })
        });
        match found {
            Some(s) => pairs.push((idx, p, s)),
            None => unmatched.push(idx),
        }
    }
    Joined { pairs, unmatched }
}

/// Pure ranking core.
///
/// `alignment` is parallel to `providers`; missing entries count as `1.0`.
/// Output is sorted by `final_score` descending, stable on ties.
pub fn rank_providers(
    providers: &[ProviderRecord],
    summaries: &[SignalSummary],
    alignment: &[f64],
) -> Vec<ScoreRecord> {
    let joined = join_signals(providers, summaries);
    rank_joined(&joined, alignment)
}

fn rank_joined(joined: &Joined<'_>, alignment: &[f64]) -> Vec<ScoreRecord> {
    let mut records: Vec<ScoreRecord> = joined
        .pairs
        .iter()
        .map(|&(idx, p, s)| {
            let m = alignment.get(idx).copied().unwrap_or(NEUTRAL_MULTIPLIER);
            score_provider(p, s, m)
        })
        .collect();
    // sort_by is stable; a non-finite score (hand-built summary) sinks
    records.sort_by(|a, b| {
        b.final_score
            .is_finite()
            .cmp(&a.final_score.is_finite())
            .then_with(|| b.final_score.total_cmp(&a.final_score))
    });
    records
}

/// Summary name most similar to `name`, when at least `threshold` similar.
pub fn near_miss<'a>(
    name: &str,
    summaries: &'a [SignalSummary],
    threshold: f64,
) -> Option<&'a SignalSummary> {
    summaries
        .iter()
        .filter(|s| s.name != name)
        .map(|s| (strsim::jaro_winkler(&name.to_lowercase(), &s.name.to_lowercase()), s))
        .filter(|(sim, _)| *sim >= threshold)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, s)| s)
}

/// Ranking service: alignment evaluation plus the pure core.
#[derive(Clone)]
pub struct ScoringEngine {
    alignment: AlignmentEvaluator,
    near_miss_threshold: f64,
}

impl ScoringEngine {
    pub fn new(alignment: AlignmentEvaluator) -> Self {
        Self {
            alignment,
            near_miss_threshold: crate::config::MatchingConfig::default().near_miss_threshold,
        }
    }

    pub fn with_near_miss_threshold(mut self, threshold: f64) -> Self {
        self.near_miss_threshold = threshold;
        self
    }

    /// Engine wired from config: judge, timeout, memoization, call cap, diagnostics.
    pub fn from_config(cfg: &RankerConfig) -> Self {
        let alignment = if cfg.alignment.enabled {
            AlignmentEvaluator::new(crate::alignment::build_judge(&cfg.llm))
                .with_timeout(cfg.alignment.timeout())
                .with_memoize(cfg.alignment.memoize)
                .with_max_concurrency(cfg.alignment.max_concurrent)
        } else {
            AlignmentEvaluator::disabled()
        };
        Self::new(alignment).with_near_miss_threshold(cfg.matching.near_miss_threshold)
    }

    pub fn alignment(&self) -> &AlignmentEvaluator {
        &self.alignment
    }

    /// Rank providers; alignment is judged only for providers that will be
    /// scored.
    pub async fn rank(
        &self,
        providers: &[ProviderRecord],
        summaries: &[SignalSummary],
        symptom: Option<&str>,
    ) -> Vec<ScoreRecord> {
        self.rank_report(providers, summaries, symptom).await.results
    }

    /// Rank and wrap the result with counts and unmatched names.
    pub async fn rank_report(
        &self,
        providers: &[ProviderRecord],
        summaries: &[SignalSummary],
        symptom: Option<&str>,
    ) -> RankingReport {
        let started = Instant::now();
        counter!("ranking_requests_total").increment(1);

        let joined = join_signals(providers, summaries);
        let mut unmatched_names = Vec::with_capacity(joined.unmatched.len());
        for &idx in &joined.unmatched {
            let p = &providers[idx];
            match near_miss(&p.name, summaries, self.near_miss_threshold) {
                Some(s) => warn!(
                    provider = %p.name,
                    candidate = %s.name,
                    "no signal summary for provider; a summary with a near-identical name exists"
                ),
                None => debug!(provider = %p.name, "no signal summary for provider; skipped"),
            }
            unmatched_names.push(p.name.clone());
        }

        // judge only what gets scored, then spread back to provider positions
        let matched: Vec<ProviderRecord> =
            joined.pairs.iter().map(|&(_, p, _)| p.clone()).collect();
        let judged = self.alignment.multipliers_for(&matched, symptom).await;
        let mut alignment = vec![NEUTRAL_MULTIPLIER; providers.len()];
        for (&(idx, _, _), m) in joined.pairs.iter().zip(judged) {
            alignment[idx] = m;
        }

        let results = rank_joined(&joined, &alignment);

        counter!("ranking_providers_scored_total").increment(results.len() as u64);
        counter!("ranking_providers_unmatched_total").increment(unmatched_names.len() as u64);
        histogram!("ranking_duration_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        info!(
            providers = providers.len(),
            scored = results.len(),
            unmatched = unmatched_names.len(),
            symptom = %symptom.map(anon_hash).unwrap_or_else(|| "-".to_string()),
            judge = self.alignment.judge_name(),
            "providers ranked"
        );

        let report = RankingReport::new(
            providers.len(),
            unmatched_names,
            symptom.is_some_and(|s| !s.trim().is_empty()),
            results,
        );
        report.log();
        report
    }
}
