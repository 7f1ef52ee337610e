// src/signals.rs
//! Parsing the review summarizer's free-text answer into a [`SignalSummary`].
//!
//! Order:
//! 1) JSON object (optionally inside a ```json fence), read field by field
//! 2) labelled lines: `Summary: ...`, `Score: X/10`, `Estimated Reviews: Y`
//! 3) documented defaults: sentiment 0, reviews = number of snippets seen

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::types::{SignalSummary, MAX_SENTIMENT, MAX_SITE_RATING};

pub const NO_REVIEWS_SUMMARY: &str = "No reviews found.";

static RE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fence regex"));
static RE_SCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)score:\s*([0-9]+(?:\.[0-9]+)?)").expect("score regex"));
static RE_REVIEWS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)estimated reviews:\s*([0-9]+)").expect("reviews regex"));
static RE_SUMMARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*summary:\s*(.+?)\s*$").expect("summary regex"));
static RE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?[0-9]+(?:\.[0-9]+)?").expect("number regex"));

/// Fields lifted out of a JSON answer one by one; a bad field is `None`
/// without affecting its neighbours.
#[derive(Debug, Default)]
struct StructuredSummary {
    sentiment: Option<f64>,
    review_count: Option<u64>,
    summary: Option<String>,
    ratings: BTreeMap<String, f64>,
}

/// Parse one provider's summarizer output.
///
/// `snippet_count` is the number of review snippets handed to the
/// summarizer; it stands in for the review count when the text gives none.
pub fn parse_signal_summary(name: &str, text: &str, snippet_count: usize) -> SignalSummary {
    let mut out = SignalSummary::empty(name);
    let text = text.trim();
    if text.is_empty() {
        out.summary = Some(NO_REVIEWS_SUMMARY.to_string());
        return out;
    }

    let fallback_reviews = u32::try_from(snippet_count).unwrap_or(u32::MAX);

    if let Some(parsed) = parse_structured(text) {
        debug!(provider = %name, "summary parsed from JSON");
        out.sentiment = parsed.sentiment.map(clamp_sentiment).unwrap_or(0.0);
        out.review_count = parsed
            .review_count
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(fallback_reviews);
        out.summary = parsed.summary.filter(|s| !s.trim().is_empty());
        out.ratings = parsed
            .ratings
            .into_iter()
            .filter(|(_, r)| r.is_finite() && (0.0..=MAX_SITE_RATING).contains(r))
            .collect();
        return out;
    }

    out.sentiment = RE_SCORE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(clamp_sentiment)
        .unwrap_or(0.0);
    out.review_count = RE_REVIEWS
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(fallback_reviews);
    out.summary = RE_SUMMARY
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    out
}

fn parse_structured(text: &str) -> Option<StructuredSummary> {
    let candidate = if let Some(c) = RE_FENCE.captures(text).and_then(|c| c.get(1)) {
        c.as_str()
    } else if text.starts_with('{') {
        text
    } else {
        return None;
    };
    let value: Value = serde_json::from_str(candidate).ok()?;
    let obj = value.as_object()?;

    Some(StructuredSummary {
        sentiment: field(obj, &["sentiment", "score"]).and_then(number_in),
        review_count: field(obj, &["review_count", "estimated_reviews"]).and_then(count_in),
        summary: field(obj, &["summary"])
            .and_then(Value::as_str)
            .map(str::to_string),
        ratings: field(obj, &["ratings"])
            .and_then(Value::as_object)
            .map(|sites| {
                sites
                    .iter()
                    .filter_map(|(site, v)| number_in(v).map(|r| (site.clone(), r)))
                    .collect()
            })
            .unwrap_or_default(),
    })
}

/// First key present wins, canonical name before its alias.
fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

/// A JSON number, or the first number inside a string such as `"8/10"`.
fn number_in(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => RE_NUMBER.find(s).and_then(|m| m.as_str().parse().ok()),
        _ => None,
    }
}

/// Non-negative whole count; fractions are truncated, negatives rejected.
fn count_in(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    number_in(v)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.trunc() as u64)
}

fn clamp_sentiment(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, MAX_SENTIMENT)
    } else {
        0.0
    }
}
