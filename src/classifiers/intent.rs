//! Intent classifier
//!
//! The authoritative path asks the model to label the request; the keyword
//! heuristic is only the fallback when the call fails or the output is
//! unusable.

use crate::llm::{ChatMessage, LlmClient};
use crate::models::{IntentLabel, IntentResult};
use crate::planning::json_utils::parse_json_object;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

lazy_static! {
    static ref EXPLAIN_CUES: Regex = Regex::new(
        r"(?i)\bwhat is\b|\bwhat's\b|\bdefine\b|\bexplain\b|\bmeaning of\b|\bhow does\b|\bwhat does\b"
    )
    .expect("Failed to compile explain cues");
    static ref TROUBLESHOOT_CUES: Regex =
        Regex::new(r"(?i)\bfix\b|\btroubleshoot\b|\bdebug\b|\bissue\b|\berror\b|\bfailing\b")
            .expect("Failed to compile troubleshoot cues");
    static ref CONFIGURE_CUES: Regex = Regex::new(
        r"(?i)\bset up\b|\bconfigure\b|\benable\b|\bdisable\b|\bmigrate\b|\bchange\b|\bmove\b|\bsecure\b|\bprotect\b"
    )
    .expect("Failed to compile configure cues");
}

/// Keyword-only intent label. Fallback path.
pub fn heuristic_intent(goal_text: &str) -> IntentLabel {
    let g = goal_text.to_lowercase();
    if g.trim().is_empty() {
        return IntentLabel::Unknown;
    }

    if EXPLAIN_CUES.is_match(&g) {
        return IntentLabel::Explain;
    }
    if TROUBLESHOOT_CUES.is_match(&g) {
        return IntentLabel::Troubleshoot;
    }
    if CONFIGURE_CUES.is_match(&g) {
        return IntentLabel::Configure;
    }

    IntentLabel::Unknown
}

const INTENT_SYSTEM_PROMPT: &str = "Classify the user's intent for a Cloudflare assistant. \
Return ONLY JSON: {\"intent\":\"explain|configure|troubleshoot|unknown\",\"needs_clarification\":boolean,\"clarifying_question\":string?}. \
Use needs_clarification when the request is ambiguous or out of Cloudflare scope.";

/// Classify the focus text, preferring the model's answer when it is usable.
///
/// Never fails: LLM errors and unusable output both degrade to the keyword
/// heuristic with `needs_clarification = false`.
pub async fn classify_intent(
    llm: &dyn LlmClient,
    focus_text: &str,
    answers: &HashMap<String, String>,
) -> IntentResult {
    let fallback = IntentResult {
        intent: heuristic_intent(focus_text),
        needs_clarification: false,
        clarifying_question: None,
    };

    let answers_json = serde_json::to_string(answers).unwrap_or_else(|_| "{}".to_string());
    let messages = [
        ChatMessage::system(INTENT_SYSTEM_PROMPT),
        ChatMessage::user(format!("Goal: {}\nAnswers: {}", focus_text, answers_json)),
    ];

    let raw = match llm.run(&messages, 256, 0.2).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!("Intent classification call failed, using heuristic: {}", e);
            return fallback;
        }
    };

    let Some(parsed) = parse_json_object(&raw) else {
        return fallback;
    };

    let label = parsed
        .get("intent")
        .and_then(|v| v.as_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    let Some(intent) = IntentLabel::parse(&label) else {
        return fallback;
    };

    let needs_clarification = parsed
        .get("needs_clarification")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let clarifying_question = parsed
        .get("clarifying_question")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    IntentResult {
        intent,
        needs_clarification,
        clarifying_question,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    #[test]
    fn test_heuristic_labels() {
        assert_eq!(heuristic_intent("what is a waf?"), IntentLabel::Explain);
        assert_eq!(heuristic_intent("fix my dns error"), IntentLabel::Troubleshoot);
        assert_eq!(heuristic_intent("secure my /api/login"), IntentLabel::Configure);
        assert_eq!(heuristic_intent("bananas"), IntentLabel::Unknown);
        assert_eq!(heuristic_intent(""), IntentLabel::Unknown);
    }

    #[test]
    fn test_heuristic_explain_wins_over_configure() {
        // Checked in order: explain cues take priority
        assert_eq!(
            heuristic_intent("what is the best way to set up dns?"),
            IntentLabel::Explain
        );
    }

    #[tokio::test]
    async fn test_model_answer_is_authoritative() {
        let llm = MockLlm::scripted(vec![
            r#"{"intent":"troubleshoot","needs_clarification":true,"clarifying_question":"Which endpoint fails?"}"#
                .to_string(),
        ]);
        let result = classify_intent(&llm, "secure my /api/login", &HashMap::new()).await;

        assert_eq!(result.intent, IntentLabel::Troubleshoot);
        assert!(result.needs_clarification);
        assert_eq!(
            result.clarifying_question.as_deref(),
            Some("Which endpoint fails?")
        );
    }

    #[tokio::test]
    async fn test_unknown_label_falls_back_to_heuristic() {
        let llm = MockLlm::scripted(vec![
            r#"{"intent":"summarize","needs_clarification":true}"#.to_string(),
        ]);
        let result = classify_intent(&llm, "secure my /api/login", &HashMap::new()).await;

        assert_eq!(result.intent, IntentLabel::Configure);
        assert!(!result.needs_clarification);
    }

    #[tokio::test]
    async fn test_garbage_output_falls_back_to_heuristic() {
        let llm = MockLlm::scripted(vec!["sure thing, here's my analysis...".to_string()]);
        let result = classify_intent(&llm, "explain dnssec", &HashMap::new()).await;

        assert_eq!(result.intent, IntentLabel::Explain);
        assert!(!result.needs_clarification);
    }
}
