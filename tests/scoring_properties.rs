// tests/scoring_properties.rs
//
// Properties of the composite score and the ranking, exercised through the
// public API only.

use provider_ranker::scoring::{base_score, rank_providers, review_score, score_provider};
use provider_ranker::{
    distance_penalty, AlignmentEvaluator, ProviderRecord, ScoringEngine, SignalSummary,
};
use rand::Rng;

fn example_providers() -> Vec<ProviderRecord> {
    vec![
        ProviderRecord::new("Dr. A", "Dermatology", "123 Main St, 5 miles"),
        ProviderRecord::new("Dr. B", "Dermatology", "9 Main St, 40 miles"),
    ]
}

fn example_summaries() -> Vec<SignalSummary> {
    vec![
        SignalSummary::new("Dr. A", 8.0, 20).unwrap(),
        SignalSummary::new("Dr. B", 9.0, 5).unwrap(),
    ]
}

#[test]
fn worked_example_ranks_near_provider_first() {
    let ranked = rank_providers(&example_providers(), &example_summaries(), &[]);
    assert_eq!(ranked.len(), 2);

    let a = &ranked[0];
    assert_eq!(a.name, "Dr. A");
    assert_eq!(a.distance_miles, 5.0);
    assert_eq!(a.distance_score, 10.0);
    assert!((a.review_score - 7.72).abs() < 0.03);
    assert_eq!(a.final_score, 8.32);
    assert_eq!(a.alignment_multiplier, 1.0);

    let b = &ranked[1];
    assert_eq!(b.name, "Dr. B");
    assert_eq!(b.distance_miles, 40.0);
    assert_eq!(b.distance_score, 0.0);
    assert!((b.review_score - 4.57).abs() < 0.02);
    assert_eq!(b.final_score, 5.87);
}

#[tokio::test]
async fn engine_without_symptom_matches_pure_core() {
    let engine = ScoringEngine::new(AlignmentEvaluator::disabled());
    let via_engine = engine
        .rank(&example_providers(), &example_summaries(), None)
        .await;
    let via_core = rank_providers(&example_providers(), &example_summaries(), &[]);
    assert_eq!(via_engine, via_core);
}

#[test]
fn review_saturation_and_zero() {
    assert_eq!(review_score(0), 0.0);
    assert_eq!(review_score(50), review_score(500));
    assert!((review_score(50) - 10.0).abs() < 1e-12);
    assert!(review_score(u32::MAX) <= 10.0);
}

#[test]
fn distance_plateau_and_floor() {
    assert_eq!(distance_penalty(0.0), 10.0);
    assert_eq!(distance_penalty(10.0), 10.0);
    assert_eq!(distance_penalty(20.0), 5.0);
    assert_eq!(distance_penalty(30.0), 0.0);
    assert_eq!(distance_penalty(100.0), 0.0);
}

#[test]
fn final_score_is_monotone_in_sentiment() {
    let mut rng = rand::rng();
    for _ in 0..500 {
        let reviews: u32 = rng.random_range(0..200);
        let miles: f64 = rng.random_range(0.0..50.0);
        let mult = [1.0, 1.05, 1.10][rng.random_range(0..3)];
        let lo: f64 = rng.random_range(0.0..10.0);
        let hi: f64 = rng.random_range(lo..=10.0);

        let p = ProviderRecord::new("Dr. X", "Dermatology", format!("1 Way, {miles:.1} miles"));
        let s_lo = SignalSummary::new("Dr. X", lo, reviews).unwrap();
        let s_hi = SignalSummary::new("Dr. X", hi, reviews).unwrap();

        let r_lo = score_provider(&p, &s_lo, mult);
        let r_hi = score_provider(&p, &s_hi, mult);
        assert!(
            r_hi.final_score >= r_lo.final_score,
            "sentiment {lo} -> {hi} lowered score {} -> {}",
            r_lo.final_score,
            r_hi.final_score
        );
    }
}

#[test]
fn base_score_stays_within_ten() {
    assert!((base_score(10.0, review_score(1000), distance_penalty(0.0)) - 10.0).abs() < 1e-9);
    assert_eq!(base_score(0.0, review_score(0), distance_penalty(31.0)), 0.0);
}

#[test]
fn join_emits_exactly_one_record_per_matched_provider() {
    let providers = vec![
        ProviderRecord::new("Dr. A", "Dermatology", "1 miles"),
        ProviderRecord::new("Dr. Unknown", "Dermatology", "1 miles"),
        ProviderRecord::new("Dr. B", "Dermatology", "1 miles"),
        ProviderRecord::new("DR. A", "Dermatology", "1 miles"),
    ];
    let summaries = vec![
        SignalSummary::new("Dr. B", 4.0, 2).unwrap(),
        SignalSummary::new("Dr. A", 6.0, 2).unwrap(),
        SignalSummary::new("Dr. Nobody", 9.0, 2).unwrap(),
    ];
    let ranked = rank_providers(&providers, &summaries, &[]);
    let names: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Dr. A", "Dr. B"]);
}

#[test]
fn ties_keep_provider_order_regardless_of_summary_order() {
    let mut providers = Vec::new();
    let mut summaries = Vec::new();
    for i in 0..12 {
        let name = format!("Dr. {i:02}");
        providers.push(ProviderRecord::new(name.clone(), "Dermatology", "2 miles"));
        summaries.push(SignalSummary::new(name, if i % 3 == 0 { 8.0 } else { 6.0 }, 10).unwrap());
    }
    summaries.reverse();

    let ranked = rank_providers(&providers, &summaries, &[]);
    assert!(ranked
        .windows(2)
        .all(|w| w[0].final_score >= w[1].final_score));
    let order: Vec<String> = ranked.iter().map(|r| r.name.clone()).collect();
    let expected: Vec<String> = [0, 3, 6, 9, 1, 2, 4, 5, 7, 8, 10, 11]
        .iter()
        .map(|i| format!("Dr. {i:02}"))
        .collect();
    assert_eq!(order, expected);
}

#[test]
fn alignment_breaks_near_ties_but_not_strong_leads() {
    let providers = vec![
        ProviderRecord::new("Generalist", "Family Medicine", "3 miles"),
        ProviderRecord::new("Specialist", "Dermatology", "3 miles"),
        ProviderRecord::new("Star", "Family Medicine", "3 miles"),
    ];
    let summaries = vec![
        SignalSummary::new("Generalist", 7.0, 30).unwrap(),
        SignalSummary::new("Specialist", 6.8, 30).unwrap(),
        SignalSummary::new("Star", 10.0, 60).unwrap(),
    ];
    let ranked = rank_providers(&providers, &summaries, &[1.0, 1.10, 1.0]);
    let order: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(order, vec!["Star", "Specialist", "Generalist"]);
}
