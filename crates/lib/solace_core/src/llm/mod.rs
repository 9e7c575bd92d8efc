//! Chat-completion oracle clients.
//!
//! [`ChatCompletion`] is the seam the classifier and the companion reply
//! strategy talk to. [`openai::OpenAiChat`] calls a hosted model;
//! [`mock::MockChat`] answers locally when mock mode is enabled.

pub mod mock;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::settings::LlmSettings;

/// Oracle transport and protocol failures.
///
/// These propagate to callers; only unparseable *content* is absorbed
/// further up (see `emotion::parse_classification`).
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Transport(String),

    #[error("LLM request timed out")]
    Timeout,

    #[error("LLM upstream returned {status}")]
    Upstream { status: u16 },

    #[error("LLM response malformed: {0}")]
    InvalidResponse(String),

    #[error("LLM configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Send `messages` and return the first choice's text.
    async fn complete(&self, messages: &[ChatMessage], temperature: f32)
    -> Result<String, LlmError>;
}

/// Build the configured oracle client.
pub fn from_settings(settings: &LlmSettings) -> Result<Arc<dyn ChatCompletion>, LlmError> {
    if settings.mock_mode {
        info!("LLM mock mode enabled, no provider calls will be made");
        return Ok(Arc::new(mock::MockChat));
    }
    info!(model = %settings.model, base_url = %settings.base_url, "LLM provider configured");
    Ok(Arc::new(openai::OpenAiChat::new(settings)?))
}
