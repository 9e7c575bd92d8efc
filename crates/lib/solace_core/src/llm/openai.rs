//! OpenAI-compatible chat completions client.
//!
//! POSTs to `{base_url}/chat/completions` with a hard per-request timeout.
//! Transport failures, 429 and 5xx are retried with exponential backoff;
//! other 4xx fail immediately.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, sleep};
use tracing::{debug, warn};

use super::{ChatCompletion, ChatMessage, LlmError};
use crate::settings::LlmSettings;

/// Backoff ceiling between attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(8);

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiChat {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_retries: u32,
}

impl OpenAiChat {
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LlmError::Config("OPENAI_API_KEY is required".to_string()))?;
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| LlmError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            model: settings.model.clone(),
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            max_retries: settings.max_retries,
        })
    }

    async fn attempt(&self, body: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(map_transport)?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            debug!(%status, body = %truncate(&detail, 200), "LLM upstream error");
            return Err(LlmError::Upstream {
                status: status.as_u16(),
            });
        }

        let data: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        extract_content(data)
    }
}

#[async_trait]
impl ChatCompletion for OpenAiChat {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, LlmError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature,
        };

        let mut attempt = 0;
        loop {
            match self.attempt(&body).await {
                Ok(content) => return Ok(content),
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    let wait = backoff(attempt);
                    warn!(error = %e, attempt = attempt + 1, wait_ms = wait.as_millis() as u64, "LLM call failed, retrying");
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn map_transport(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Transport(e.to_string())
    }
}

fn is_retryable(e: &LlmError) -> bool {
    match e {
        LlmError::Transport(_) | LlmError::Timeout => true,
        LlmError::Upstream { status } => {
            *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
        }
        LlmError::InvalidResponse(_) | LlmError::Config(_) => false,
    }
}

/// 500ms, 1s, 2s, ... capped at [`MAX_BACKOFF`].
fn backoff(attempt: u32) -> Duration {
    let millis = 500u64.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(millis).min(MAX_BACKOFF)
}

/// Longest a single `complete` call can take: every attempt timing out
/// plus every backoff sleep between them.
pub fn worst_case_duration(settings: &LlmSettings) -> Duration {
    let attempts = settings.max_retries + 1;
    let sleeps: Duration = (0..settings.max_retries).map(backoff).sum();
    settings.timeout() * attempts + sleeps
}

fn extract_content(data: CompletionResponse) -> Result<String, LlmError> {
    data.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
