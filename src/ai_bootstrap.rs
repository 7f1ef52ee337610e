// src/ai_bootstrap.rs
use crate::alignment::AlignmentEvaluator;
use crate::config::RankerConfig;
use crate::scoring::ScoringEngine;
use tracing::{info, warn};

pub struct AlignmentRuntime {
    pub cfg: RankerConfig,
    pub engine: ScoringEngine,
}

impl AlignmentRuntime {
    pub fn from_config(cfg: RankerConfig) -> Self {
        // Safe diagnostics: only provider + enabled + key length
        info!(
            "ranker cfg loaded: provider={}, alignment_enabled={}, timeout_ms={}, max_concurrent={}, key_len={}",
            cfg.llm.provider,
            cfg.alignment.enabled,
            cfg.alignment.timeout_ms,
            cfg.alignment.max_concurrent,
            cfg.llm.api_key.len()
        );
        let engine = ScoringEngine::from_config(&cfg);
        Self { cfg, engine }
    }

    pub fn alignment(&self) -> &AlignmentEvaluator {
        self.engine.alignment()
    }

    /// One judgment with a fixed, obviously-aligned pair. Never fails; logs
    /// the multiplier it got back.
    pub async fn quick_probe(&self) -> f64 {
        if !self.cfg.alignment.enabled {
            warn!("alignment quick_probe skipped: alignment is disabled in config");
            return crate::alignment::NEUTRAL_MULTIPLIER;
        }
        let m = self
            .alignment()
            .compute_alignment_reward("Dermatology", Some("persistent itchy rash"))
            .await;
        info!(judge = self.alignment().judge_name(), multiplier = m, "alignment quick_probe");
        m
    }
}
