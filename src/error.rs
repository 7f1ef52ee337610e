//! Typed errors for the ranking library.

use thiserror::Error;

/// A signal summary that cannot be scored honestly.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SignalError {
    #[error("sentiment for {name} is not a finite number")]
    NonFiniteSentiment { name: String },
    #[error("sentiment {value} for {name} is outside 0..=10")]
    SentimentOutOfRange { name: String, value: f64 },
    #[error("rating {value} from {site} for {name} is outside 0..=5")]
    RatingOutOfRange {
        name: String,
        site: String,
        value: f64,
    },
}

/// Failure of the specialty/symptom judgment collaborator.
///
/// These never escape the alignment evaluator; they are logged and mapped to
/// a neutral multiplier.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("no API key configured for {provider}")]
    MissingApiKey { provider: &'static str },
    #[error("judge request failed")]
    Http(#[from] reqwest::Error),
    #[error("judge returned HTTP {status}")]
    Status { status: u16 },
    #[error("judge returned an empty answer")]
    EmptyAnswer,
    #[error("judge is disabled")]
    Disabled,
    #[error("judge failed: {0}")]
    Other(String),
}
