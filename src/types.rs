// src/types.rs
//! Records flowing through the ranking pipeline: discovered providers, their
//! aggregated review signal, and the ranked output rows.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::SignalError;

/// Highest sentiment a summary may carry.
pub const MAX_SENTIMENT: f64 = 10.0;
/// Highest per-site star rating.
pub const MAX_SITE_RATING: f64 = 5.0;

/// Stable identifier assigned at discovery time and threaded through the
/// summarization step, so joins do not depend on free-text names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(pub String);

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One provider returned by the insurer directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProviderId>,
    pub name: String,
    pub specialty: String,
    /// Free text; the portal appends e.g. "• 3.1 miles".
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ProviderRecord {
    pub fn new(
        name: impl Into<String>,
        specialty: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            specialty: specialty.into(),
            address: address.into(),
            phone: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<ProviderId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Aggregated review signal for one provider.
///
/// Construction validates sentiment (finite, within `0..=10`); deserialization
/// goes through the same check. Fields stay public; ranking sorts a
/// non-finite score from a hand-edited summary below every real one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSignalSummary")]
pub struct SignalSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProviderId>,
    pub name: String,
    pub sentiment: f64,
    pub review_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Per-site star ratings (0–5), keyed by site name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ratings: BTreeMap<String, f64>,
}

impl SignalSummary {
    pub fn new(
        name: impl Into<String>,
        sentiment: f64,
        review_count: u32,
    ) -> Result<Self, SignalError> {
        let name = name.into();
        validate_sentiment(&name, sentiment)?;
        Ok(Self {
            id: None,
            name,
            sentiment,
            review_count,
            summary: None,
            ratings: BTreeMap::new(),
        })
    }

    /// "Nothing found" summary: zero sentiment, zero reviews.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            sentiment: 0.0,
            review_count: 0,
            summary: None,
            ratings: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<ProviderId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach a per-site rating; ratings outside `0..=5` are rejected.
    pub fn with_rating(mut self, site: impl Into<String>, rating: f64) -> Result<Self, SignalError> {
        let site = site.into();
        if !rating.is_finite() || !(0.0..=MAX_SITE_RATING).contains(&rating) {
            return Err(SignalError::RatingOutOfRange {
                name: self.name.clone(),
                site,
                value: rating,
            });
        }
        self.ratings.insert(site, rating);
        Ok(self)
    }
}

fn validate_sentiment(name: &str, sentiment: f64) -> Result<(), SignalError> {
    if !sentiment.is_finite() {
        return Err(SignalError::NonFiniteSentiment {
            name: name.to_string(),
        });
    }
    if !(0.0..=MAX_SENTIMENT).contains(&sentiment) {
        return Err(SignalError::SentimentOutOfRange {
            name: name.to_string(),
            value: sentiment,
        });
    }
    Ok(())
}

/// Wire shape before validation.
#[derive(Deserialize)]
struct RawSignalSummary {
    #[serde(default)]
    id: Option<ProviderId>,
    name: String,
    sentiment: f64,
    review_count: u32,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    ratings: BTreeMap<String, f64>,
}

impl TryFrom<RawSignalSummary> for SignalSummary {
    type Error = SignalError;

    fn try_from(raw: RawSignalSummary) -> Result<Self, Self::Error> {
        let mut out = SignalSummary::new(raw.name, raw.sentiment, raw.review_count)?;
        out.id = raw.id;
        out.summary = raw.summary;
        for (site, rating) in raw.ratings {
            out = out.with_rating(site, rating)?;
        }
        Ok(out)
    }
}

/// One ranked output row with every intermediate signal kept for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProviderId>,
    pub name: String,
    pub final_score: f64,
    pub sentiment: f64,
    pub review_count: u32,
    pub review_score: f64,
    pub distance_miles: f64,
    pub distance_score: f64,
    pub alignment_multiplier: f64,
}
