// src/config/mod.rs
//! Runtime configuration from `config/ranker.toml` (or `$RANKER_CONFIG_PATH`),
//! with env overrides for the alignment switches.

pub mod llm;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use llm::LlmConfig;

pub const DEFAULT_RANKER_CONFIG_PATH: &str = "config/ranker.toml";
pub const ENV_RANKER_CONFIG_PATH: &str = "RANKER_CONFIG_PATH";
pub const ENV_ALIGNMENT_ENABLED: &str = "ALIGNMENT_ENABLED";
pub const ENV_ALIGNMENT_TIMEOUT_MS: &str = "ALIGNMENT_TIMEOUT_MS";
pub const ENV_ALIGNMENT_MAX_CONCURRENT: &str = "ALIGNMENT_MAX_CONCURRENT";

fn default_true() -> bool {
    true
}
fn default_timeout_ms() -> u64 {
    8_000
}
fn default_max_concurrent() -> usize {
    crate::alignment::DEFAULT_MAX_CONCURRENT_JUDGMENTS
}
fn default_near_miss() -> f64 {
    0.92
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankerConfig {
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlignmentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_true")]
    pub memoize: bool,
    /// Upper bound on judge calls in flight for one ranking batch.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: default_timeout_ms(),
            memoize: true,
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl AlignmentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Jaro-Winkler similarity at which an unmatched provider name is reported
    /// as a probable naming drift.
    #[serde(default = "default_near_miss")]
    pub near_miss_threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            near_miss_threshold: default_near_miss(),
        }
    }
}

impl RankerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: RankerConfig = toml::from_str(s).context("parsing ranker config")?;
        cfg.normalize()?;
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading ranker config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    /// Resolve the config path and load it, then apply env overrides:
    /// 1) $RANKER_CONFIG_PATH (must exist)
    /// 2) config/ranker.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_RANKER_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("RANKER_CONFIG_PATH points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else {
            let default = PathBuf::from(DEFAULT_RANKER_CONFIG_PATH);
            if default.exists() {
                Self::load_from_file(&default)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn normalize(&mut self) -> Result<()> {
        self.llm.normalize()?;
        if !(0.0..=1.0).contains(&self.matching.near_miss_threshold) {
            self.matching.near_miss_threshold = default_near_miss();
        }
        if self.alignment.timeout_ms == 0 {
            self.alignment.timeout_ms = default_timeout_ms();
        }
        if self.alignment.max_concurrent == 0 {
            self.alignment.max_concurrent = default_max_concurrent();
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var(ENV_ALIGNMENT_ENABLED) {
            match v.trim() {
                "1" | "true" | "on" => self.alignment.enabled = true,
                "0" | "false" | "off" => self.alignment.enabled = false,
                _ => {}
            }
        }
        if let Some(ms) = std::env::var(ENV_ALIGNMENT_TIMEOUT_MS)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            self.alignment.timeout_ms = ms;
        }
        if let Some(n) = std::env::var(ENV_ALIGNMENT_MAX_CONCURRENT)
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
        {
            self.alignment.max_concurrent = n;
        }
    }
}
