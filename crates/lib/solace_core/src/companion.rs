//! Reply strategy for companion chat.
//!
//! The latest user message is classified and triaged. Crisis and support
//! decisions answer with fixed templates; everything else is passed through
//! to the oracle with the companion system prompt.

use serde::Serialize;
use tracing::info;

use crate::emotion::classify;
use crate::llm::{ChatCompletion, ChatMessage, ChatRole, LlmError};
use crate::triage::{AgentDecision, NextAction, decide};

pub const COMPANION_SYSTEM_PROMPT: &str = "You are the ChatService for a mental-health support app. \
Respond in a supportive, empathetic, non-judgmental, and safe manner. \
Avoid clinical or medical advice. Use gentle and validating language, \
and encourage coping strategies when appropriate.";

pub const NORMAL_REPLY_TEMPERATURE: f32 = 0.5;

pub const CRISIS_REPLY: &str = "It sounds like you may be going through a very overwhelming and difficult moment right now. \
Thank you for sharing this with me \u{2014} you\u{2019}re not alone here. \u{1f49b}\n\n\
Here are a few supportive options that may help you cope in this moment:\n\
\u{2022} A short guided breathing exercise (30 seconds)\n\
\u{2022} A grounding technique to help you feel more present\n\
\u{2022} Reaching out to someone you trust for support\n\
\u{2022} Accessing a crisis helpline if you feel you may be in immediate danger\n\n\
Which of these would you feel most comfortable trying right now?";

pub const SUPPORT_REPLY: &str = "Thank you for expressing how you\u{2019}re feeling. It makes sense that this situation may feel stressful or heavy for you.\n\n\
If you\u{2019}d like, we could try something that may help you feel a little more grounded:\n\
\u{2022} A 5-minute breathing exercise\n\
\u{2022} The 5-4-3-2-1 grounding technique\n\
\u{2022} A one-sentence mood journaling activity (I can guide you)\n\n\
Would any of these feel helpful to try?";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatOutcome {
    pub reply: String,
    pub decision: AgentDecision,
}

/// Most recent `user` message, or `""` when there is none.
pub fn latest_user_message(history: &[ChatMessage]) -> &str {
    history
        .iter()
        .rev()
        .find(|m| m.role == ChatRole::User)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

pub async fn respond(
    oracle: &dyn ChatCompletion,
    history: &[ChatMessage],
) -> Result<ChatOutcome, LlmError> {
    let emotion = classify(oracle, latest_user_message(history)).await?;
    let decision = decide(emotion);

    let reply = match decision.next_action {
        NextAction::CrisisFlow => {
            info!(
                event = "crisis_flow",
                label = %decision.emotion.label,
                intensity = decision.emotion.intensity,
                "crisis template served"
            );
            CRISIS_REPLY.to_string()
        }
        NextAction::SupportSuggestion => SUPPORT_REPLY.to_string(),
        NextAction::NormalReply => {
            let mut messages = Vec::with_capacity(history.len() + 1);
            messages.push(ChatMessage::system(COMPANION_SYSTEM_PROMPT));
            messages.extend_from_slice(history);
            oracle.complete(&messages, NORMAL_REPLY_TEMPERATURE).await?
        }
    };

    Ok(ChatOutcome { reply, decision })
}
