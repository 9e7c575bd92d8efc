//! Offline responder used when mock mode is enabled.

use async_trait::async_trait;

use super::{ChatCompletion, ChatMessage, ChatRole, LlmError};
use crate::emotion::CLASSIFIER_SYSTEM_PROMPT;

const MOCK_REPLY: &str = "Thank you for sharing that with me. I'm here to listen. \
                          Would you like to tell me a bit more about how you're feeling?";

/// (label, keywords, intensity). First hit wins.
const KEYWORDS: &[(&str, &[&str], f64)] = &[
    ("sadness", &["hopeless", "worthless", "give up", "end it"], 0.9),
    ("sadness", &["sad", "lonely", "cry", "down"], 0.6),
    ("stress", &["overwhelmed", "panic", "can't cope"], 0.9),
    ("stress", &["stress", "anxious", "worried", "deadline", "exam"], 0.6),
    ("anger", &["furious", "rage", "hate"], 0.9),
    ("anger", &["angry", "annoyed", "frustrated"], 0.6),
    ("joy", &["happy", "great", "excited", "glad"], 0.7),
];

/// Deterministic stand-in for a hosted model.
///
/// Classifier requests get a keyword-derived JSON classification; every
/// other conversation gets a fixed supportive reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockChat;

#[async_trait]
impl ChatCompletion for MockChat {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _temperature: f32,
    ) -> Result<String, LlmError> {
        let is_classifier = messages
            .first()
            .is_some_and(|m| m.role == ChatRole::System && m.content == CLASSIFIER_SYSTEM_PROMPT);
        if !is_classifier {
            return Ok(MOCK_REPLY.to_string());
        }
        let text = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.to_lowercase())
            .unwrap_or_default();
        Ok(classify_keywords(&text).to_string())
    }
}

fn classify_keywords(text: &str) -> serde_json::Value {
    let hit = KEYWORDS
        .iter()
        .find(|(_, words, _)| words.iter().any(|w| text.contains(w)));
    let (label, intensity, rationale) = match hit {
        Some((label, _, intensity)) => (*label, *intensity, "Keyword match (mock mode)."),
        None => ("neutral", 0.2, "No emotional keywords found (mock mode)."),
    };
    serde_json::json!({ "label": label, "intensity": intensity, "rationale": rationale })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::{EmotionLabel, classify};
    use crate::triage::{NextAction, decide};

    #[tokio::test]
    async fn classifier_requests_get_json() {
        let r = classify(&MockChat, "I feel hopeless and want to give up")
            .await
            .unwrap();
        assert_eq!(r.label, EmotionLabel::Sadness);
        assert_eq!(decide(r).next_action, NextAction::CrisisFlow);

        let r = classify(&MockChat, "So much stress about the exam").await.unwrap();
        assert_eq!(decide(r).next_action, NextAction::SupportSuggestion);

        let r = classify(&MockChat, "Had lunch").await.unwrap();
        assert_eq!(r.label, EmotionLabel::Neutral);
        assert!(!r.is_fallback());
    }

    #[tokio::test]
    async fn other_conversations_get_fixed_reply() {
        let reply = MockChat
            .complete(&[ChatMessage::system("be kind"), ChatMessage::user("hi")], 0.5)
            .await
            .unwrap();
        assert_eq!(reply, MOCK_REPLY);
    }
}
