//! Emotion classification via the chat oracle.
//!
//! The oracle is asked for a bare JSON object. Replies that wrap it in prose
//! are tolerated; replies that cannot be read at all degrade to
//! [`EmotionResult::fallback`]. Transport failures are not absorbed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm::{ChatCompletion, ChatMessage, LlmError};

pub const CLASSIFIER_SYSTEM_PROMPT: &str = "\
You are an emotion classifier for mental-health chat messages.

Your job is ONLY to classify the user's emotional state.

Return a JSON with EXACTLY these 3 fields:
- label: one of [\"joy\", \"neutral\", \"stress\", \"sadness\", \"anger\"]
- intensity: a float between 0 and 1
- rationale: a short 1-sentence explanation for the classification

Do NOT include any extra text outside the JSON.";

/// Rationale carried by the fail-soft result.
pub const FALLBACK_RATIONALE: &str = "fallback";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Joy,
    Neutral,
    Stress,
    Sadness,
    Anger,
}

impl EmotionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Joy => "joy",
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Stress => "stress",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Anger => "anger",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "joy" => Ok(EmotionLabel::Joy),
            "neutral" => Ok(EmotionLabel::Neutral),
            "stress" => Ok(EmotionLabel::Stress),
            "sadness" => Ok(EmotionLabel::Sadness),
            "anger" => Ok(EmotionLabel::Anger),
            other => Err(format!("unknown emotion label: {other}")),
        }
    }
}

/// One classification. Intensity is always within `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionResult {
    pub label: EmotionLabel,
    pub intensity: f64,
    pub rationale: String,
}

impl EmotionResult {
    /// Clamps `intensity` into `[0, 1]`; NaN becomes 0.
    pub fn new(label: EmotionLabel, intensity: f64, rationale: impl Into<String>) -> Self {
        let intensity = if intensity.is_nan() {
            0.0
        } else {
            intensity.clamp(0.0, 1.0)
        };
        Self {
            label,
            intensity,
            rationale: rationale.into(),
        }
    }

    pub fn fallback() -> Self {
        Self::new(EmotionLabel::Neutral, 0.0, FALLBACK_RATIONALE)
    }

    /// Whether this is the fail-soft result rather than a real reading.
    pub fn is_fallback(&self) -> bool {
        self.label == EmotionLabel::Neutral
            && self.intensity == 0.0
            && self.rationale == FALLBACK_RATIONALE
    }
}

#[derive(Deserialize)]
struct RawClassification {
    label: String,
    intensity: RawIntensity,
    rationale: String,
}

/// Some models quote the number (`"0.92"`).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawIntensity {
    Number(f64),
    Text(String),
}

impl RawIntensity {
    fn value(&self) -> Option<f64> {
        match self {
            RawIntensity::Number(n) => Some(*n),
            RawIntensity::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Read an oracle reply. Never fails: anything unreadable yields the
/// fallback result.
pub fn parse_classification(raw: &str) -> EmotionResult {
    let parsed = serde_json::from_str::<RawClassification>(raw.trim())
        .ok()
        .or_else(|| embedded_object(raw).and_then(|s| serde_json::from_str(s).ok()));

    let Some(raw_result) = parsed else {
        debug!("classifier reply had no readable JSON object");
        return EmotionResult::fallback();
    };
    let Some(intensity) = raw_result.intensity.value() else {
        debug!("classifier reply had a non-numeric intensity");
        return EmotionResult::fallback();
    };
    match raw_result.label.parse::<EmotionLabel>() {
        Ok(label) => EmotionResult::new(label, intensity, raw_result.rationale),
        Err(e) => {
            debug!(error = %e, "classifier reply rejected");
            EmotionResult::fallback()
        }
    }
}

/// Substring from the first `{` through the last `}`.
fn embedded_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

/// Classify `text` with one oracle call at temperature 0.
pub async fn classify(oracle: &dyn ChatCompletion, text: &str) -> Result<EmotionResult, LlmError> {
    let messages = [
        ChatMessage::system(CLASSIFIER_SYSTEM_PROMPT),
        ChatMessage::user(text),
    ];
    let raw = oracle.complete(&messages, 0.0).await.inspect_err(|e| {
        warn!(error = %e, "emotion classification call failed");
    })?;
    let result = parse_classification(&raw);
    debug!(label = %result.label, intensity = result.intensity, "emotion classified");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Scripted {
        reply: Result<String, ()>,
        seen: Mutex<Vec<(Vec<ChatMessage>, f32)>>,
    }

    impl Scripted {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatCompletion for Scripted {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            temperature: f32,
        ) -> Result<String, LlmError> {
            self.seen
                .lock()
                .unwrap()
                .push((messages.to_vec(), temperature));
            self.reply.clone().map_err(|_| LlmError::Timeout)
        }
    }

    #[test]
    fn clean_json_parses() {
        let r = parse_classification(
            r#"{"label": "sadness", "intensity": 0.9, "rationale": "User feels hopeless."}"#,
        );
        assert_eq!(r.label, EmotionLabel::Sadness);
        assert_eq!(r.intensity, 0.9);
        assert_eq!(r.rationale, "User feels hopeless.");
        assert!(!r.is_fallback());
    }

    #[test]
    fn json_wrapped_in_prose_parses() {
        let raw = "Sure! Here is the result:\n```json\n{\"label\":\"stress\",\"intensity\":0.6,\"rationale\":\"Deadline pressure.\"}\n```\nHope that helps.";
        let r = parse_classification(raw);
        assert_eq!(r.label, EmotionLabel::Stress);
        assert_eq!(r.intensity, 0.6);
    }

    #[test]
    fn prose_without_json_falls_back() {
        let r = parse_classification("I think the user is sad");
        assert!(r.is_fallback());
        assert_eq!(r, EmotionResult::fallback());
    }

    #[test]
    fn missing_field_falls_back() {
        assert!(parse_classification(r#"{"label":"anger","intensity":0.7}"#).is_fallback());
        assert!(parse_classification(r#"{"label":"anger","rationale":"x"}"#).is_fallback());
    }

    #[test]
    fn unknown_label_falls_back() {
        assert!(
            parse_classification(r#"{"label":"fear","intensity":0.9,"rationale":"x"}"#)
                .is_fallback()
        );
    }

    #[test]
    fn label_is_case_and_space_insensitive() {
        let r = parse_classification(r#"{"label":" Anger ","intensity":0.7,"rationale":"x"}"#);
        assert_eq!(r.label, EmotionLabel::Anger);
    }

    #[test]
    fn intensity_is_clamped() {
        let hi = parse_classification(r#"{"label":"joy","intensity":1.7,"rationale":"x"}"#);
        assert_eq!(hi.intensity, 1.0);
        let lo = parse_classification(r#"{"label":"joy","intensity":-3,"rationale":"x"}"#);
        assert_eq!(lo.intensity, 0.0);
        assert_eq!(EmotionResult::new(EmotionLabel::Joy, f64::NAN, "x").intensity, 0.0);
    }

    #[test]
    fn quoted_intensity_is_read_as_number() {
        let r = parse_classification(
            r#"{"label":"sadness","intensity":"0.92","rationale":"hopeless"}"#,
        );
        assert!(!r.is_fallback());
        assert_eq!(r.label, EmotionLabel::Sadness);
        assert_eq!(r.intensity, 0.92);
        assert_eq!(
            crate::triage::decide(r).next_action,
            crate::triage::NextAction::CrisisFlow
        );

        let padded = parse_classification(r#"{"label":"joy","intensity":" 1.5 ","rationale":"x"}"#);
        assert_eq!(padded.intensity, 1.0);
        assert!(
            parse_classification(r#"{"label":"anger","intensity":"very","rationale":"x"}"#)
                .is_fallback()
        );
    }

    #[test]
    fn reversed_braces_fall_back() {
        assert!(parse_classification("} nothing here {").is_fallback());
    }

    #[test]
    fn serializes_lowercase_label() {
        let json = serde_json::to_value(EmotionResult::fallback()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "label": "neutral", "intensity": 0.0, "rationale": "fallback" })
        );
    }

    #[tokio::test]
    async fn classify_sends_prompt_at_zero_temperature() {
        let oracle = Scripted::ok(r#"{"label":"joy","intensity":0.8,"rationale":"Good news."}"#);
        let r = classify(&oracle, "I got the job!").await.unwrap();
        assert_eq!(r.label, EmotionLabel::Joy);

        let seen = oracle.seen.lock().unwrap();
        let (messages, temperature) = &seen[0];
        assert_eq!(*temperature, 0.0);
        assert_eq!(messages[0], ChatMessage::system(CLASSIFIER_SYSTEM_PROMPT));
        assert_eq!(messages[1], ChatMessage::user("I got the job!"));
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let oracle = Scripted {
            reply: Err(()),
            seen: Mutex::new(Vec::new()),
        };
        assert!(matches!(
            classify(&oracle, "hello").await,
            Err(LlmError::Timeout)
        ));
    }
}
