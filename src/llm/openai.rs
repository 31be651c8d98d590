//! OpenAI chat-completions client used as a [`Disambiguator`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::prompt::{build_user_prompt, parse_answer, select_candidates, SYSTEM_PROMPT};
use crate::config::DisambiguationConfig;
use crate::error::{ConfigError, DisambiguationError};
use crate::matching::Disambiguator;
use crate::models::{RegistryRecord, SourceRecord};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Shares one HTTP client across calls; safe to use concurrently.
#[derive(Clone)]
pub struct OpenAiDisambiguator {
    api_key: String,
    client: reqwest::Client,
    endpoint: String,
    model: String,
    timeout: Duration,
    max_prompt_candidates: usize,
}

impl OpenAiDisambiguator {
    pub fn new(api_key: String, model: &str, timeout: Duration, max_prompt_candidates: usize) -> Result<Self, DisambiguationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.to_string(),
            timeout,
            max_prompt_candidates: max_prompt_candidates.max(1),
        })
    }

    pub fn from_config(cfg: &DisambiguationConfig) -> anyhow::Result<Self> {
        let api_key = cfg.api_key.clone().ok_or(ConfigError::MissingField("OPENAI_API_KEY"))?;
        Ok(Self::new(api_key, &cfg.model, Duration::from_secs(cfg.timeout_secs), cfg.max_prompt_candidates)?)
    }

    /// Points the client at another chat-completions compatible endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn complete(&self, user_prompt: &str) -> Result<String, DisambiguationError> {
        let body = serde_json::json!({
            "model": &self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "temperature": 0
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { DisambiguationError::Timeout(self.timeout) } else { DisambiguationError::Transport(e) })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DisambiguationError::Service { status, body });
        }

        let text = response.text().await?;
        extract_content(&text)
    }
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

fn extract_content(raw: &str) -> Result<String, DisambiguationError> {
    let parsed: ApiResponse = serde_json::from_str(raw)
        .map_err(|e| DisambiguationError::Malformed(format!("unparseable response: {}", e)))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| DisambiguationError::Malformed("no message content".to_string()))
}

#[async_trait]
impl Disambiguator for OpenAiDisambiguator {
    async fn disambiguate(&self, record: &SourceRecord, candidates: &[RegistryRecord]) -> Result<Option<String>, DisambiguationError> {
        let shown = select_candidates(record, candidates, self.max_prompt_candidates);
        if shown.is_empty() {
            return Ok(None);
        }
        let prompt = build_user_prompt(record, &shown);
        let answer = self.complete(&prompt).await?;
        log::debug!("Model answer for {}: {}", record.domain, answer.trim());
        Ok(parse_answer(&answer))
    }
}
