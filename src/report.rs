// src/report.rs
//! Ranked output with counts, plus the human-readable listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::ScoreRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    pub generated_at: DateTime<Utc>,
    pub providers_in: usize,
    pub scored: usize,
    /// Providers dropped for lack of a signal summary, in input order.
    pub unmatched: Vec<String>,
    pub symptom_provided: bool,
    pub results: Vec<ScoreRecord>,
}

impl RankingReport {
    pub fn new(
        providers_in: usize,
        unmatched: Vec<String>,
        symptom_provided: bool,
        results: Vec<ScoreRecord>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            providers_in,
            scored: results.len(),
            unmatched,
            symptom_provided,
            results,
        }
    }

    /// One line per ranked provider, 1-based.
    pub fn render_lines(&self) -> Vec<String> {
        self.results
            .iter()
            .enumerate()
            .map(|(i, r)| render_line(i + 1, r))
            .collect()
    }

    pub fn log(&self) {
        for line in self.render_lines() {
            info!(target: "ranking", "{line}");
        }
    }
}

fn render_line(rank: usize, r: &ScoreRecord) -> String {
    let bonus = if r.alignment_multiplier > 1.0 {
        format!(" (x{})", r.alignment_multiplier)
    } else {
        String::new()
    };
    format!(
        "{rank}. {} - Score {}{bonus} (Sentiment {}/10, Reviews {}, Distance {} mi)",
        r.name, r.final_score, r.sentiment, r.review_count, r.distance_miles
    )
}
