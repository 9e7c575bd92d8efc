//! Single-message triage policy.
//!
//! [`decide`] is pure and total: the same classification always yields the
//! same decision, and nothing from earlier turns is consulted.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::emotion::{EmotionLabel, EmotionResult};

pub const HIGH_RISK_LABELS: [EmotionLabel; 3] = [
    EmotionLabel::Sadness,
    EmotionLabel::Stress,
    EmotionLabel::Anger,
];

pub const CRISIS_THRESHOLD: f64 = 0.85;
pub const SUPPORT_THRESHOLD: f64 = 0.55;

/// Escalation code attached to crisis decisions.
pub const CRISIS_ESCALATION_CODE: &str = "UC-001";

/// Coping techniques offered with support decisions.
pub const SUPPORT_TECHNIQUES: &str = "breathing, grounding_54321, journaling";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    NormalReply,
    SupportSuggestion,
    CrisisFlow,
}

impl NextAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NextAction::NormalReply => "normal_reply",
            NextAction::SupportSuggestion => "support_suggestion",
            NextAction::CrisisFlow => "crisis_flow",
        }
    }
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDecision {
    pub next_action: NextAction,
    pub reason: String,
    pub emotion: EmotionResult,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

pub fn is_high_risk(label: EmotionLabel) -> bool {
    HIGH_RISK_LABELS.contains(&label)
}

/// Map a classification to the next conversational step. First match wins:
/// crisis, then support, then normal.
pub fn decide(emotion: EmotionResult) -> AgentDecision {
    let high_risk = is_high_risk(emotion.label);

    if high_risk && emotion.intensity >= CRISIS_THRESHOLD {
        return AgentDecision {
            next_action: NextAction::CrisisFlow,
            reason: format!(
                "High-risk emotional state detected; escalate to crisis support ({CRISIS_ESCALATION_CODE})."
            ),
            emotion,
            metadata: BTreeMap::from([(
                "escalation".to_string(),
                CRISIS_ESCALATION_CODE.to_string(),
            )]),
        };
    }

    if high_risk && emotion.intensity >= SUPPORT_THRESHOLD {
        return AgentDecision {
            next_action: NextAction::SupportSuggestion,
            reason: "Negative emotion detected; provide coping strategies.".to_string(),
            emotion,
            metadata: BTreeMap::from([(
                "suggestions".to_string(),
                SUPPORT_TECHNIQUES.to_string(),
            )]),
        };
    }

    AgentDecision {
        next_action: NextAction::NormalReply,
        reason: "Emotion within normal/positive levels; continue regular chat.".to_string(),
        emotion,
        metadata: BTreeMap::new(),
    }
}
