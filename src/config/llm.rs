// src/config/llm.rs
use serde::{Deserialize, Serialize};
use std::env;

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    16
}

/// Judgment model settings (`[llm]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai" | "openrouter" | "mock" | "disabled" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Literal key, or "ENV" meaning: read OPENROUTER_API_KEY / OPENAI_API_KEY.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            model: None,
            api_key: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl LlmConfig {
    pub fn base_url(&self) -> String {
        match (&self.base_url, self.provider.as_str()) {
            (Some(url), _) => url.clone(),
            (None, "openai") => OPENAI_BASE_URL.to_string(),
            (None, _) => OPENROUTER_BASE_URL.to_string(),
        }
    }

    pub fn model(&self) -> String {
        match (&self.model, self.provider.as_str()) {
            (Some(m), _) => m.clone(),
            (None, "openai") => "gpt-4o-mini".to_string(),
            (None, _) => "nvidia/nemotron-nano-9b-v2".to_string(),
        }
    }

    /// Normalize provider casing, resolve an "ENV" key and sanitize sampling.
    pub(crate) fn normalize(&mut self) -> anyhow::Result<()> {
        self.provider = self.provider.trim().to_lowercase();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match self.provider.as_str() {
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                "openrouter" => env::var("OPENROUTER_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENROUTER_API_KEY env var"))?,
                other => anyhow::bail!("Unsupported provider for ENV api key: {other}"),
            };
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            self.temperature = default_temperature();
        }
        if self.max_tokens == 0 {
            self.max_tokens = default_max_tokens();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_provider() {
        let mut cfg = LlmConfig {
            provider: "OpenAI".into(),
            ..LlmConfig::default()
        };
        cfg.normalize().unwrap();
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.base_url(), OPENAI_BASE_URL);
        assert_eq!(cfg.model(), "gpt-4o-mini");

        let router = LlmConfig {
            provider: "openrouter".into(),
            ..LlmConfig::default()
        };
        assert_eq!(router.base_url(), OPENROUTER_BASE_URL);
        assert_eq!(router.model(), "nvidia/nemotron-nano-9b-v2");
    }

    #[serial_test::serial]
    #[test]
    fn env_key_is_resolved_or_rejected() {
        env::set_var("OPENROUTER_API_KEY", "sk-test");
        let mut cfg = LlmConfig {
            provider: "openrouter".into(),
            api_key: "ENV".into(),
            ..LlmConfig::default()
        };
        cfg.normalize().unwrap();
        assert_eq!(cfg.api_key, "sk-test");

        env::remove_var("OPENROUTER_API_KEY");
        let mut missing = LlmConfig {
            provider: "openrouter".into(),
            api_key: "env".into(),
            ..LlmConfig::default()
        };
        assert!(missing.normalize().is_err());
    }

    #[test]
    fn sampling_is_sanitized() {
        let mut cfg = LlmConfig {
            temperature: 9.0,
            max_tokens: 0,
            ..LlmConfig::default()
        };
        cfg.normalize().unwrap();
        assert_eq!(cfg.temperature, 0.3);
        assert_eq!(cfg.max_tokens, 16);
    }
}
