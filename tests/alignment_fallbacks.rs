// tests/alignment_fallbacks.rs
//
// Alignment must never block or fail a ranking: slow, failing and chatty
// judges all degrade to the neutral multiplier.

use async_trait::async_trait;
use provider_ranker::alignment::MockJudge;
use provider_ranker::error::JudgeError;
use provider_ranker::{AlignmentEvaluator, AlignmentJudge, ProviderRecord, ScoringEngine, SignalSummary};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct SlowJudge;

#[async_trait]
impl AlignmentJudge for SlowJudge {
    async fn classify(&self, _specialty: &str, _symptom: &str) -> Result<String, JudgeError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("YES".into())
    }
    fn name(&self) -> &'static str {
        "slow"
    }
}

struct FailingJudge;

#[async_trait]
impl AlignmentJudge for FailingJudge {
    async fn classify(&self, _specialty: &str, _symptom: &str) -> Result<String, JudgeError> {
        Err(JudgeError::Status { status: 503 })
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Records how many calls overlap.
#[derive(Default)]
struct CountingJudge {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl AlignmentJudge for CountingJudge {
    async fn classify(&self, _specialty: &str, _symptom: &str) -> Result<String, JudgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok("YES".into())
    }
    fn name(&self) -> &'static str {
        "counting"
    }
}

fn providers() -> Vec<ProviderRecord> {
    vec![
        ProviderRecord::new("Dr. A", "Dermatology", "2 miles"),
        ProviderRecord::new("Dr. B", "Allergy and Immunology", "2 miles"),
    ]
}

fn summaries() -> Vec<SignalSummary> {
    vec![
        SignalSummary::new("Dr. A", 7.0, 10).unwrap(),
        SignalSummary::new("Dr. B", 7.0, 10).unwrap(),
    ]
}

#[tokio::test(start_paused = true)]
async fn timeout_degrades_to_neutral() {
    let eval = AlignmentEvaluator::new(Arc::new(SlowJudge)).with_timeout(Duration::from_millis(50));
    let m = eval.compute_alignment_reward("Dermatology", Some("rash")).await;
    assert_eq!(m, 1.0);

    let engine = ScoringEngine::new(eval);
    let ranked = engine.rank(&providers(), &summaries(), Some("rash")).await;
    assert_eq!(ranked.len(), 2);
    assert!(ranked.iter().all(|r| r.alignment_multiplier == 1.0));
}

#[tokio::test]
async fn judge_errors_degrade_to_neutral() {
    let engine = ScoringEngine::new(AlignmentEvaluator::new(Arc::new(FailingJudge)));
    let ranked = engine.rank(&providers(), &summaries(), Some("hives")).await;
    assert_eq!(ranked.len(), 2);
    assert!(ranked.iter().all(|r| r.alignment_multiplier == 1.0));
}

#[tokio::test]
async fn unrecognized_answers_are_treated_as_no() {
    let judge = Arc::new(MockJudge::always("It depends on the patient's history."));
    let eval = AlignmentEvaluator::new(judge);
    assert_eq!(eval.compute_alignment_reward("Dermatology", Some("rash")).await, 1.0);
}

#[tokio::test]
async fn aligned_specialty_wins_the_tie() {
    let judge = Arc::new(
        MockJudge::always("NO")
            .with_answer("Allergy and Immunology", "YES")
            .with_answer("Dermatology", "MAYBE"),
    );
    let engine = ScoringEngine::new(AlignmentEvaluator::new(judge.clone()));
    let ranked = engine.rank(&providers(), &summaries(), Some("hives")).await;
    assert_eq!(ranked[0].name, "Dr. B");
    assert_eq!(ranked[0].alignment_multiplier, 1.10);
    assert_eq!(ranked[1].alignment_multiplier, 1.05);
    assert_eq!(judge.calls(), 2);

    // without a symptom the judge is never consulted and input order holds
    let ranked = engine.rank(&providers(), &summaries(), None).await;
    assert_eq!(ranked[0].name, "Dr. A");
    assert_eq!(judge.calls(), 2);
}

#[tokio::test]
async fn unmatched_providers_are_not_judged() {
    let judge = Arc::new(MockJudge::always("YES"));
    let engine = ScoringEngine::new(AlignmentEvaluator::new(judge.clone()).with_memoize(false));
    let only_a = vec![SignalSummary::new("Dr. A", 7.0, 10).unwrap()];
    let report = engine
        .rank_report(&providers(), &only_a, Some("rash"))
        .await;
    assert_eq!(report.scored, 1);
    assert_eq!(report.unmatched, vec!["Dr. B".to_string()]);
    assert_eq!(judge.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn judge_calls_in_flight_are_capped() {
    let judge = Arc::new(CountingJudge::default());
    let eval = AlignmentEvaluator::new(judge.clone())
        .with_memoize(false)
        .with_max_concurrency(2);
    let many: Vec<ProviderRecord> = (0..10)
        .map(|i| ProviderRecord::new(format!("Dr. {i}"), "Dermatology", "2 miles"))
        .collect();

    let multipliers = eval.multipliers_for(&many, Some("rash")).await;
    assert_eq!(multipliers, vec![1.10; 10]);
    assert_eq!(judge.calls.load(Ordering::SeqCst), 10);
    assert_eq!(judge.peak.load(Ordering::SeqCst), 2);
}
