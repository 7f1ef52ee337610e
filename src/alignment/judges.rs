// src/alignment/judges.rs
//! Judge implementations: an OpenAI-compatible chat client, a disabled judge
//! and a deterministic mock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::{AlignmentJudge, DynJudge};
use crate::config::LlmConfig;
use crate::error::JudgeError;

/// Chat Completions judge. Works against OpenAI and OpenRouter alike.
pub struct ChatJudge {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    provider: &'static str,
}

impl ChatJudge {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self, JudgeError> {
        let http = reqwest::Client::builder()
            .user_agent("provider-ranker/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()?;
        let provider = match cfg.provider.as_str() {
            "openrouter" => "openrouter",
            _ => "openai",
        };
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", cfg.base_url().trim_end_matches('/')),
            api_key: cfg.api_key.clone(),
            model: cfg.model(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            provider,
        })
    }
}

fn judgment_prompt(specialty: &str, symptom: &str) -> String {
    format!(
        "Is the medical specialty \"{specialty}\" appropriate for treating or diagnosing \
         the symptom/disease \"{symptom}\"?\nAnswer with one word only: YES, MAYBE, or NO."
    )
}

#[async_trait]
impl AlignmentJudge for ChatJudge {
    async fn classify(&self, specialty: &str, symptom: &str) -> Result<String, JudgeError> {
        if self.api_key.is_empty() {
            return Err(JudgeError::MissingApiKey {
                provider: self.provider,
            });
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let prompt = judgment_prompt(specialty, symptom);
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: "You are a medical expert.",
                },
                Msg {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(JudgeError::Status {
                status: resp.status().as_u16(),
            });
        }
        let body: Resp = resp.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(JudgeError::EmptyAnswer);
        }
        Ok(content)
    }

    fn name(&self) -> &'static str {
        self.provider
    }
}

/// Never called; alignment stays neutral.
pub struct DisabledJudge;

#[async_trait]
impl AlignmentJudge for DisabledJudge {
    async fn classify(&self, _specialty: &str, _symptom: &str) -> Result<String, JudgeError> {
        Err(JudgeError::Disabled)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Deterministic judge for tests and local runs. Answers per specialty,
/// falling back to a default, and counts calls.
#[derive(Debug, Default)]
pub struct MockJudge {
    default_answer: String,
    answers: HashMap<String, String>,
    calls: AtomicUsize,
}

impl MockJudge {
    pub fn always(answer: &str) -> Self {
        Self {
            default_answer: answer.to_string(),
            ..Self::default()
        }
    }

    pub fn with_answer(mut self, specialty: &str, answer: &str) -> Self {
        self.answers
            .insert(specialty.to_string(), answer.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AlignmentJudge for MockJudge {
    async fn classify(&self, specialty: &str, _symptom: &str) -> Result<String, JudgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .answers
            .get(specialty)
            .cloned()
            .unwrap_or_else(|| self.default_answer.clone()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Factory: build a judge according to config and environment.
///
/// * `AI_TEST_MODE=mock` returns a mock that answers "MAYBE" for everything.
/// * provider `"disabled"` (or an unknown provider) returns [`DisabledJudge`].
/// * `"openai"` / `"openrouter"` build a [`ChatJudge`]; a client build failure
///   is logged and degrades to [`DisabledJudge`].
pub fn build_judge(cfg: &LlmConfig) -> DynJudge {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockJudge::always("MAYBE"));
    }

    match cfg.provider.as_str() {
        "openai" | "openrouter" => match ChatJudge::from_config(cfg) {
            Ok(judge) => Arc::new(judge),
            Err(e) => {
                warn!(error = %e, "failed to build chat judge; alignment disabled");
                Arc::new(DisabledJudge)
            }
        },
        "mock" => Arc::new(MockJudge::always("MAYBE")),
        _ => Arc::new(DisabledJudge),
    }
}
