// src/distance.rs
//! Distance resolution from the portal's free-text address, and the
//! piecewise-linear proximity score.
//!
//! - `<= 10` miles: full score (10.0)
//! - `10..=30` miles: linear from 10.0 down to 0.0
//! - `> 30` miles: 0.0

use once_cell::sync::Lazy;
use regex::Regex;

/// Assumed distance when the address carries no "N miles" phrase.
pub const DEFAULT_DISTANCE_MILES: f64 = 10.0;

const FULL_SCORE_MILES: f64 = 10.0;
const ZERO_SCORE_MILES: f64 = 30.0;
const MAX_DISTANCE_SCORE: f64 = 10.0;

static RE_MILES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([0-9]+(?:\.[0-9]+)?)\s*miles").expect("miles regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// First "<number> miles" phrase in `address`, if any.
pub fn extract_distance(address: &str) -> Option<f64> {
    RE_MILES
        .captures(address)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Distance in miles, defaulting to [`DEFAULT_DISTANCE_MILES`] when unknown.
pub fn resolve_distance(address: &str) -> f64 {
    extract_distance(address).unwrap_or(DEFAULT_DISTANCE_MILES)
}

/// Proximity score in `0.0..=10.0`, rounded to 2 decimals inside the band.
pub fn distance_penalty(distance: f64) -> f64 {
    if distance <= FULL_SCORE_MILES {
        MAX_DISTANCE_SCORE
    } else if distance <= ZERO_SCORE_MILES {
        let band = ZERO_SCORE_MILES - FULL_SCORE_MILES;
        round2(MAX_DISTANCE_SCORE - ((distance - FULL_SCORE_MILES) / band) * MAX_DISTANCE_SCORE)
    } else {
        0.0
    }
}

/// Display form of a scraped address: entities decoded, portal decoration
/// after the first bullet dropped, whitespace collapsed.
///
/// Distance extraction must run on the raw string; the miles phrase usually
/// sits after the bullet.
pub fn clean_address(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    let head = decoded
        .split('\u{2022}')
        .next()
        .unwrap_or_default()
        .split("\u{e2}\u{20ac}\u{a2}")
        .next()
        .unwrap_or_default();
    RE_WS.replace_all(head, " ").trim().to_string()
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
