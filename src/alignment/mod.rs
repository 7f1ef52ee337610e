// src/alignment/mod.rs
//! Specialty/symptom alignment: a three-way judgment (YES / MAYBE / NO)
//! collapsed into a small multiplicative bonus on the base score.
//!
//! The judgment itself comes from an external collaborator (usually a hosted
//! language model). Every failure mode (timeout, transport error, unknown
//! answer) degrades to the neutral multiplier `1.0`.

pub mod judges;

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::JudgeError;
use crate::types::ProviderRecord;

pub use judges::{build_judge, ChatJudge, DisabledJudge, MockJudge};

pub const NEUTRAL_MULTIPLIER: f64 = 1.0;
pub const MAYBE_MULTIPLIER: f64 = 1.05;
pub const YES_MULTIPLIER: f64 = 1.10;

pub const DEFAULT_JUDGE_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_MAX_CONCURRENT_JUDGMENTS: usize = 4;

/// Parsed answer of the judgment collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlignmentVerdict {
    Yes,
    Maybe,
    No,
}

impl AlignmentVerdict {
    pub fn multiplier(self) -> f64 {
        match self {
            AlignmentVerdict::Yes => YES_MULTIPLIER,
            AlignmentVerdict::Maybe => MAYBE_MULTIPLIER,
            AlignmentVerdict::No => NEUTRAL_MULTIPLIER,
        }
    }

    fn label(self) -> &'static str {
        match self {
            AlignmentVerdict::Yes => "yes",
            AlignmentVerdict::Maybe => "maybe",
            AlignmentVerdict::No => "no",
        }
    }
}

/// Strict parse of a raw judge answer.
///
/// Accepts a bare word (`"YES"`, `" maybe."`, `"**No**"`) or a JSON object
/// `{"verdict": "..."}`. Anything unrecognized is `No`.
pub fn parse_verdict(answer: &str) -> AlignmentVerdict {
    #[derive(Deserialize)]
    struct Structured {
        #[serde(alias = "answer")]
        verdict: String,
    }

    let trimmed = answer.trim();
    if trimmed.starts_with('{') {
        return match serde_json::from_str::<Structured>(trimmed) {
            Ok(s) => parse_word(&s.verdict),
            Err(_) => AlignmentVerdict::No,
        };
    }
    parse_word(trimmed)
}

fn parse_word(raw: &str) -> AlignmentVerdict {
    let word = raw
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_ascii_uppercase();
    if word.starts_with("YES") {
        AlignmentVerdict::Yes
    } else if word.starts_with("MAYBE") {
        AlignmentVerdict::Maybe
    } else {
        AlignmentVerdict::No
    }
}

/// External judgment collaborator: is `specialty` appropriate for `symptom`?
///
/// Implementations return the raw answer text; parsing stays in this module.
#[async_trait]
pub trait AlignmentJudge: Send + Sync {
    async fn classify(&self, specialty: &str, symptom: &str) -> Result<String, JudgeError>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Disabled judges are never called; alignment is neutral.
    fn is_enabled(&self) -> bool {
        true
    }
}

pub type DynJudge = Arc<dyn AlignmentJudge>;

/// Wraps a judge with a per-call timeout, per-batch memoization, a cap on
/// calls in flight and the neutral fallback policy.
///
/// Clones share the cap, so it bounds every batch ranked through one engine.
#[derive(Clone)]
pub struct AlignmentEvaluator {
    judge: DynJudge,
    timeout: Duration,
    memoize: bool,
    permits: Arc<Semaphore>,
}

impl AlignmentEvaluator {
    pub fn new(judge: DynJudge) -> Self {
        Self {
            judge,
            timeout: DEFAULT_JUDGE_TIMEOUT,
            memoize: true,
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_JUDGMENTS)),
        }
    }

    /// At most `limit` judge calls in flight (`0` is read as `1`).
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(limit.max(1)));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    /// Evaluator that never calls out; every multiplier is `1.0`.
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledJudge))
    }

    pub fn judge_name(&self) -> &'static str {
        self.judge.name()
    }

    /// Multiplier for one specialty. No symptom means no call and `1.0`.
    pub async fn compute_alignment_reward(&self, specialty: &str, symptom: Option<&str>) -> f64 {
        let Some(symptom) = normalized_symptom(symptom) else {
            return NEUTRAL_MULTIPLIER;
        };
        if !self.judge.is_enabled() {
            return NEUTRAL_MULTIPLIER;
        }
        judge_bounded(
            self.permits.clone(),
            self.judge.clone(),
            self.timeout,
            specialty.to_string(),
            Arc::from(symptom),
        )
        .await
    }

    /// One multiplier per provider, in provider order.
    ///
    /// With memoization on, each distinct specialty is judged once. Distinct
    /// judgments run concurrently up to the evaluator's cap; results are only
    /// read after all finish.
    pub async fn multipliers_for(
        &self,
        providers: &[ProviderRecord],
        symptom: Option<&str>,
    ) -> Vec<f64> {
        let neutral = vec![NEUTRAL_MULTIPLIER; providers.len()];
        let Some(symptom) = normalized_symptom(symptom) else {
            return neutral;
        };
        if !self.judge.is_enabled() || providers.is_empty() {
            debug!(judge = self.judge.name(), "alignment skipped");
            return neutral;
        }

        // slot per distinct job; provider -> slot
        let mut slots: Vec<String> = Vec::new();
        let mut provider_slot: Vec<usize> = Vec::with_capacity(providers.len());
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for p in providers {
            let slot = if self.memoize {
                if let Some(&slot) = seen.get(p.specialty.as_str()) {
                    counter!("alignment_cache_hits_total").increment(1);
                    slot
                } else {
                    slots.push(p.specialty.clone());
                    seen.insert(p.specialty.as_str(), slots.len() - 1);
                    slots.len() - 1
                }
            } else {
                slots.push(p.specialty.clone());
                slots.len() - 1
            };
            provider_slot.push(slot);
        }

        let symptom: Arc<str> = Arc::from(symptom);
        let mut set = JoinSet::new();
        for (slot, specialty) in slots.iter().enumerate() {
            let judge = self.judge.clone();
            let symptom = symptom.clone();
            let specialty = specialty.clone();
            let timeout = self.timeout;
            let permits = self.permits.clone();
            set.spawn(async move {
                (slot, judge_bounded(permits, judge, timeout, specialty, symptom).await)
            });
        }

        let mut by_slot = vec![NEUTRAL_MULTIPLIER; slots.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((slot, m)) => by_slot[slot] = m,
                Err(e) => {
                    warn!(error = ?e, "alignment task aborted; using neutral multiplier");
                    counter!("alignment_fallbacks_total", "reason" => "task").increment(1);
                }
            }
        }

        provider_slot.into_iter().map(|slot| by_slot[slot]).collect()
    }
}

fn normalized_symptom(symptom: Option<&str>) -> Option<&str> {
    symptom.map(str::trim).filter(|s| !s.is_empty())
}

/// Waits for a permit, then judges; the timeout covers only the call.
async fn judge_bounded(
    permits: Arc<Semaphore>,
    judge: DynJudge,
    timeout: Duration,
    specialty: String,
    symptom: Arc<str>,
) -> f64 {
    let Ok(_permit) = permits.acquire_owned().await else {
        counter!("alignment_fallbacks_total", "reason" => "closed").increment(1);
        return NEUTRAL_MULTIPLIER;
    };
    judge_once(judge, timeout, specialty, symptom).await
}

async fn judge_once(
    judge: DynJudge,
    timeout: Duration,
    specialty: String,
    symptom: Arc<str>,
) -> f64 {
    let symptom_id = anon_hash(&symptom);
    match tokio::time::timeout(timeout, judge.classify(&specialty, &symptom)).await {
        Ok(Ok(answer)) => {
            let verdict = parse_verdict(&answer);
            counter!("alignment_judgments_total", "verdict" => verdict.label()).increment(1);
            debug!(
                judge = judge.name(),
                %specialty,
                symptom = %symptom_id,
                verdict = verdict.label(),
                "alignment judged"
            );
            verdict.multiplier()
        }
        Ok(Err(e)) => {
            warn!(
                judge = judge.name(),
                %specialty,
                symptom = %symptom_id,
                error = %e,
                "alignment check failed; using neutral multiplier"
            );
            counter!("alignment_fallbacks_total", "reason" => "error").increment(1);
            NEUTRAL_MULTIPLIER
        }
        Err(_) => {
            warn!(
                judge = judge.name(),
                %specialty,
                symptom = %symptom_id,
                timeout_ms = timeout.as_millis() as u64,
                "alignment check timed out; using neutral multiplier"
            );
            counter!("alignment_fallbacks_total", "reason" => "timeout").increment(1);
            NEUTRAL_MULTIPLIER
        }
    }
}

/// Short SHA-256 prefix used in place of symptom text in logs.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
