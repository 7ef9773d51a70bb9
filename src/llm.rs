//! Generation client
//!
//! Thin chat-completions client with per-call timeout and linear backoff.
//! The pipeline only sees the `TextGenerator` trait, so tests can swap in
//! scripted generators.

use crate::config::LlmConfig;
use crate::error::{InsightsError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_RETRIES: u32 = 3;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce a completion for `prompt`, trying at most `retries` times.
    async fn generate(&self, prompt: &str, max_tokens: u32, retries: u32) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Outcome of a single HTTP round trip
enum AttemptError {
    /// Timeouts, transport failures and non-2xx statuses; retried with backoff
    Retryable(String),
    /// Retrying cannot help
    Fatal(String),
}

#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
    backoff_unit: Duration,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| InsightsError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            endpoint: format!("{}/chat/completions", config.base_url),
            model: config.model.clone(),
            temperature: config.temperature,
            backoff_unit: config.backoff_unit,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn attempt(&self, request: &ChatRequest<'_>) -> std::result::Result<String, AttemptError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AttemptError::Retryable(format!("LLM API call timed out: {}", e))
                } else {
                    AttemptError::Retryable(format!("LLM API call failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AttemptError::Retryable(format!(
                "LLM API error ({}): {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::Retryable(format!("Failed to parse LLM response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AttemptError::Fatal("empty response".to_string()))
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str, max_tokens: u32, retries: u32) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: self.temperature,
        };

        let attempts = retries.max(1);
        let mut last_cause = String::new();

        for attempt in 1..=attempts {
            debug!("LLM call attempt {} of {} (model {})", attempt, attempts, self.model);
            match self.attempt(&request).await {
                Ok(content) => {
                    info!("LLM responded on attempt {} ({} chars)", attempt, content.len());
                    return Ok(content);
                }
                Err(AttemptError::Fatal(cause)) => {
                    warn!("LLM call failed without retry: {}", cause);
                    return Err(InsightsError::Generation(cause));
                }
                Err(AttemptError::Retryable(cause)) => {
                    warn!("LLM call attempt {}/{} failed: {}", attempt, attempts, cause);
                    last_cause = cause;
                    if attempt < attempts {
                        tokio::time::sleep(self.backoff_unit * (attempt * 2)).await;
                    }
                }
            }
        }

        Err(InsightsError::Generation(format!(
            "LLM call failed after {} attempts: {}",
            attempts, last_cause
        )))
    }
}
