// src/api.rs
//! HTTP surface: ranking, summary parsing and distance preview.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::distance::{clean_address, distance_penalty, extract_distance, DEFAULT_DISTANCE_MILES};
use crate::report::RankingReport;
use crate::scoring::ScoringEngine;
use crate::signals::parse_signal_summary;
use crate::types::{ProviderRecord, SignalSummary};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ScoringEngine>,
}

impl AppState {
    pub fn new(engine: ScoringEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/rank", post(rank))
        .route("/signals/parse", post(parse_signals))
        .route("/distance", post(distance))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct RankReq {
    providers: Vec<ProviderRecord>,
    summaries: Vec<SignalSummary>,
    #[serde(default)]
    symptom: Option<String>,
}

// Malformed summaries fail inside the Json extractor (422).
async fn rank(State(state): State<AppState>, Json(body): Json<RankReq>) -> Json<RankingReport> {
    let report = state
        .engine
        .rank_report(&body.providers, &body.summaries, body.symptom.as_deref())
        .await;
    Json(report)
}

#[derive(Deserialize)]
struct ParseReq {
    name: String,
    text: String,
    #[serde(default)]
    snippet_count: usize,
}

async fn parse_signals(Json(body): Json<ParseReq>) -> Json<SignalSummary> {
    Json(parse_signal_summary(&body.name, &body.text, body.snippet_count))
}

#[derive(Deserialize)]
struct DistanceReq {
    address: String,
}

#[derive(Serialize)]
struct DistanceResp {
    /// `None` when the address has no "N miles" phrase.
    extracted_miles: Option<f64>,
    distance_miles: f64,
    distance_score: f64,
    clean_address: String,
}

async fn distance(Json(body): Json<DistanceReq>) -> Json<DistanceResp> {
    let extracted = extract_distance(&body.address);
    let miles = extracted.unwrap_or(DEFAULT_DISTANCE_MILES);
    Json(DistanceResp {
        extracted_miles: extracted,
        distance_miles: miles,
        distance_score: distance_penalty(miles),
        clean_address: clean_address(&body.address),
    })
}
