//! Clarifying-question generation
//!
//! Only the configure intent triggers follow-ups. The model is asked for at
//! most two questions; anything malformed degrades to no questions rather
//! than blocking the plan.

use crate::llm::{ChatMessage, LlmClient};
use crate::models::{GoalTopic, IntentLabel, PendingQuestion};
use crate::planning::json_utils::parse_json_object;
use std::collections::HashMap;

const FOLLOWUP_SYSTEM_PROMPT: &str = r#"You are generating follow-up questions for a Cloudflare configuration assistant.

Rules:
- Output VALID JSON ONLY. No markdown.
- Ask at most 2 questions.
- Questions must be broadly applicable (no "GoDaddy vs Cloudflare" assumptions).
- Questions should only ask for info that is truly required to produce a correct Cloudflare plan.
- If enough info already exists, return an empty array.
- If Missing info is provided, prioritize asking about those items.

Return schema:
{ "follow_up_questions": { "key": string, "question": string }[] }

Key conventions:
- Use snake_case keys.
- Prefer keys like: dns_provider, domain, protected_path, traffic, app_type, routes, cache_goal, mail_provider, has_dnssec.

Topic guidance:
- dns: ask where DNS is hosted (provider/registrar), domain, email provider/records, dnssec status.
- security: ask critical endpoint/path and rough traffic; avoid asking for too much.
- workers: ask what they're deploying + routes.
- performance: ask site type + what they optimize for."#;

pub struct FollowUpRequest<'a> {
    pub goal: &'a str,
    pub topic: GoalTopic,
    pub intent: IntentLabel,
    pub answers: &'a HashMap<String, String>,
    pub missing: &'a [String],
}

fn extract_questions(parsed: &serde_json::Value) -> Vec<PendingQuestion> {
    let arr = match parsed.get("follow_up_questions").and_then(|v| v.as_array()) {
        Some(a) => a,
        None => return Vec::new(),
    };
    arr.iter()
        .filter_map(|q| {
            let key = q.get("key").and_then(|v| v.as_str()).unwrap_or("").trim();
            let question = q
                .get("question")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim();
            if key.is_empty() || question.is_empty() {
                None
            } else {
                Some(PendingQuestion {
                    key: key.to_string(),
                    question: question.to_string(),
                })
            }
        })
        .take(2)
        .collect()
}

/// Ask the model which details are still needed before a plan can be acted
/// on. Transport failures surface to the caller; malformed output yields an
/// empty list.
pub async fn generate_followups(
    llm: &dyn LlmClient,
    req: &FollowUpRequest<'_>,
) -> crate::Result<Vec<PendingQuestion>> {
    if req.intent != IntentLabel::Configure {
        return Ok(Vec::new());
    }

    let user = format!(
        "Goal: {}\nTopic: {}\nKnown answers: {}\nMissing info: {}",
        req.goal,
        req.topic,
        serde_json::to_string(req.answers)?,
        serde_json::to_string(req.missing)?,
    );
    let messages = [
        ChatMessage::system(FOLLOWUP_SYSTEM_PROMPT),
        ChatMessage::user(&user),
    ];

    let raw = llm.run(&messages, 512, 0.2).await?;
    Ok(parse_json_object(&raw)
        .map(|v| extract_questions(&v))
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    fn req<'a>(
        intent: IntentLabel,
        answers: &'a HashMap<String, String>,
        missing: &'a [String],
    ) -> FollowUpRequest<'a> {
        FollowUpRequest {
            goal: "secure my /api/login",
            topic: GoalTopic::Security,
            intent,
            answers,
            missing,
        }
    }

    #[tokio::test]
    async fn test_caps_questions_at_two() {
        let llm = MockLlm::scripted(vec![
            r#"{"follow_up_questions": [
                {"key": "protected_path", "question": "Which path?"},
                {"key": "traffic", "question": "How much traffic?"},
                {"key": "extra", "question": "Anything else?"}
            ]}"#
            .to_string(),
        ]);
        let answers = HashMap::new();
        let missing = vec!["protected_path".to_string()];

        let qs = generate_followups(&llm, &req(IntentLabel::Configure, &answers, &missing))
            .await
            .unwrap();
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[0].key, "protected_path");
    }

    #[tokio::test]
    async fn test_non_configure_intent_asks_nothing() {
        let llm = MockLlm::scripted(vec![
            r#"{"follow_up_questions": [{"key": "x", "question": "y"}]}"#.to_string(),
        ]);
        let answers = HashMap::new();

        let qs = generate_followups(&llm, &req(IntentLabel::Explain, &answers, &[]))
            .await
            .unwrap();
        assert!(qs.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_output_yields_empty_list() {
        let llm = MockLlm::scripted(vec!["I cannot answer in JSON.".to_string()]);
        let answers = HashMap::new();

        let qs = generate_followups(&llm, &req(IntentLabel::Configure, &answers, &[]))
            .await
            .unwrap();
        assert!(qs.is_empty());
    }

    #[tokio::test]
    async fn test_blank_entries_are_dropped() {
        let llm = MockLlm::scripted(vec![
            r#"{"follow_up_questions": [
                {"key": "  ", "question": "Which path?"},
                {"key": "traffic", "question": ""},
                {"key": "traffic", "question": "How much traffic?"}
            ]}"#
            .to_string(),
        ]);
        let answers = HashMap::new();

        let qs = generate_followups(&llm, &req(IntentLabel::Configure, &answers, &[]))
            .await
            .unwrap();
        assert_eq!(qs.len(), 1);
        assert_eq!(qs[0].key, "traffic");
    }
}
