//! Plan generation pipeline
//!
//! Orchestrates classification, retrieval, synthesis, normalization, and
//! policy enforcement into one `generate` call. Synthesis makes at most
//! three LLM calls: the initial attempt, one strict retry, one repair pass;
//! after that the deterministic fallback templates take over. Every path
//! ends in `normalize_plan` + `enforce_policy`, so the output shape and the
//! safety guarantees hold no matter which path produced the content.

pub mod fallbacks;
pub mod followups;
pub mod json_utils;
pub mod normalize;
pub mod policy;
pub mod sources;
pub mod system_prompt;

use crate::classifiers::{classify_goal, classify_intent};
use crate::classifiers::goal::infer_topic;
use crate::llm::{ChatMessage, LlmClient};
use crate::models::{GoalTopic, IntentLabel, PendingQuestion, Plan, SessionState};
use crate::retrieval::ContextRetriever;
use fallbacks::{
    build_dns_fallback, build_invalid_json_fallback, build_performance_fallback,
    build_security_fallback,
};
use followups::{generate_followups, FollowUpRequest};
use json_utils::parse_json_object;
use normalize::{normalize_plan, NormalizeOptions};
use policy::{enforce_policy, is_valid_scope, PolicyContext};
use serde_json::{json, Value};
use sources::filter_sources_by_topic;
use std::sync::Arc;
use system_prompt::SYSTEM_PROMPT;
use tracing::{debug, info, warn};

const PLAN_MAX_TOKENS: u32 = 1400;
const PLAN_TEMPERATURE: f32 = 0.2;
const RAW_CAPTURE_CHARS: usize = 1200;

const RETRY_NOTE: &str = "RETRY: Return ONLY valid JSON object. No extra text.";
const REPAIR_SYSTEM_PROMPT: &str = "You are a JSON repair assistant. Return ONLY a valid JSON \
object that matches the schema. Do not include markdown or extra text.";

pub fn default_rollout() -> Vec<String> {
    ["Log/observe", "Partial enforcement", "Full enforcement"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn default_metrics() -> Vec<String> {
    ["Error rate", "Latency", "Rate-limit hits", "WAF actions"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Everything a caller needs after one generate call: the plan itself, the
/// questions to surface, and the serialized form to persist.
pub struct GeneratePlanOutcome {
    pub plan: Plan,
    pub pending_questions: Vec<PendingQuestion>,
    pub last_plan_json: String,
}

struct Attempt {
    raw: String,
    parsed: Option<Value>,
}

pub struct PlanGenerator {
    llm: Arc<dyn LlmClient>,
    retriever: Arc<dyn ContextRetriever>,
}

impl PlanGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, retriever: Arc<dyn ContextRetriever>) -> Self {
        Self { llm, retriever }
    }

    async fn synthesize(
        &self,
        intent: IntentLabel,
        goal: &str,
        answers_json: &str,
        context: &str,
        extra_system_note: Option<&str>,
    ) -> crate::Result<Attempt> {
        let system = match extra_system_note {
            Some(note) => format!("{}\n\n{}", SYSTEM_PROMPT, note),
            None => SYSTEM_PROMPT.to_string(),
        };
        let user = format!(
            "Intent: {}\nGoal: {}\nAnswers: {}\n\nSOURCES:\n{}",
            intent, goal, answers_json, context
        );
        let messages = [ChatMessage::system(system), ChatMessage::user(user)];

        let raw = self
            .llm
            .run(&messages, PLAN_MAX_TOKENS, PLAN_TEMPERATURE)
            .await?;
        let parsed = parse_json_object(&raw);
        Ok(Attempt { raw, parsed })
    }

    async fn repair(&self, broken: &str) -> crate::Result<Attempt> {
        let messages = [
            ChatMessage::system(REPAIR_SYSTEM_PROMPT),
            ChatMessage::user(broken),
        ];
        let raw = self
            .llm
            .run(&messages, PLAN_MAX_TOKENS, PLAN_TEMPERATURE)
            .await?;
        let parsed = parse_json_object(&raw);
        Ok(Attempt { raw, parsed })
    }

    /// Generate a plan from the current session state. Re-derives everything
    /// from goal + answers + followups; nothing from a previous plan carries
    /// over.
    pub async fn generate(&self, state: &SessionState) -> crate::Result<GeneratePlanOutcome> {
        let goal = state.goal.as_deref().unwrap_or("").trim().to_string();
        let answers = &state.answers;
        let followups = &state.followups;
        let last_followup = followups.last().cloned().unwrap_or_default();

        let rollout_defaults = default_rollout();
        let metric_defaults = default_metrics();

        if goal.is_empty() {
            return Ok(empty_goal_outcome(&rollout_defaults, &metric_defaults));
        }

        info!(goal = %goal, "Generating plan");

        let answers_value = serde_json::to_value(answers)?;
        let mut query_parts: Vec<&str> = vec![goal.as_str()];
        query_parts.extend(followups.iter().map(|s| s.as_str()));
        let answers_query = answers_value.to_string();
        query_parts.push(&answers_query);
        let context_query = query_parts
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        let retrieved = self.retriever.retrieve(&context_query).await?;

        let intent_focus = if last_followup.is_empty() {
            goal.as_str()
        } else {
            last_followup.as_str()
        };
        let intent = classify_intent(self.llm.as_ref(), intent_focus, answers).await;

        let classification_text = std::iter::once(goal.as_str())
            .chain(followups.iter().map(|s| s.as_str()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        let classification = classify_goal(&classification_text);

        // followups ride along as one more answer field for the model
        let mut answers_payload = match answers_value {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        answers_payload.insert("followups".to_string(), json!(followups));
        let answers_json = Value::Object(answers_payload).to_string();

        let mut attempt = self
            .synthesize(intent.intent, &goal, &answers_json, &retrieved.context, None)
            .await?;
        let mut used_retry = false;

        if attempt.parsed.is_none() {
            used_retry = true;
            debug!("Plan synthesis returned unusable JSON, retrying once");
            attempt = self
                .synthesize(
                    intent.intent,
                    &goal,
                    &answers_json,
                    &retrieved.context,
                    Some(RETRY_NOTE),
                )
                .await?;
        }

        let repair_attempt = if attempt.parsed.is_none() {
            debug!("Retry also unusable, attempting JSON repair");
            Some(self.repair(&attempt.raw).await?)
        } else {
            None
        };

        let normalize_opts = NormalizeOptions {
            intent: intent.intent,
            default_rollout: rollout_defaults.clone(),
            default_metrics: metric_defaults.clone(),
            sources: retrieved.sources.clone(),
        };

        let mut plan = if let Some(parsed) = attempt.parsed.as_ref() {
            normalize_plan(parsed, &normalize_opts)
        } else if let Some(parsed) = repair_attempt.as_ref().and_then(|a| a.parsed.as_ref()) {
            normalize_plan(parsed, &normalize_opts)
        } else {
            let forced_topic = if classification.topic != GoalTopic::General {
                classification.topic
            } else {
                infer_topic(intent_focus).unwrap_or(GoalTopic::General)
            };
            warn!(topic = %forced_topic, "All synthesis attempts failed, using fallback template");

            let cache_goal = answers.get("cache_goal").map(|s| s.as_str()).unwrap_or("");
            let template = match forced_topic {
                GoalTopic::Dns => build_dns_fallback(&rollout_defaults, &metric_defaults),
                GoalTopic::Security => build_security_fallback(&rollout_defaults, &metric_defaults),
                GoalTopic::Performance => build_performance_fallback(cache_goal),
                _ => build_invalid_json_fallback(&rollout_defaults, &metric_defaults),
            };

            let mut fallback_plan = normalize_plan(&template, &normalize_opts);
            fallback_plan.raw = Some(attempt.raw.chars().take(RAW_CAPTURE_CHARS).collect());
            fallback_plan
        };

        plan.used_retry = used_retry;

        enforce_policy(
            &mut plan,
            &PolicyContext {
                goal: &goal,
                intent: intent.intent,
                default_rollout: &rollout_defaults,
                default_metrics: &metric_defaults,
            },
        );

        // the deterministic classifier has the final word on topic
        if let Some(forced) = infer_topic(&goal) {
            plan.topic = forced;
        }

        plan.sources = filter_sources_by_topic(plan.topic, &retrieved.sources, &retrieved.matches);

        // model follow-ups are advisory only; regenerate from actual gaps
        plan.follow_up_questions = Vec::new();

        let blank = |key: &str| answers.get(key).map(|v| v.trim().is_empty()).unwrap_or(true);
        let mut missing: Vec<String> = Vec::new();
        let mut push_missing = |key: &str| missing.push(key.to_string());
        match plan.topic {
            GoalTopic::Dns => {
                if blank("dns_provider") {
                    push_missing("dns_provider");
                }
                if blank("email_dns") {
                    push_missing("email_dns");
                }
            }
            GoalTopic::Workers => {
                if blank("app_type") {
                    push_missing("app_type");
                }
                if blank("routes") {
                    push_missing("routes");
                }
            }
            GoalTopic::Performance => {
                if blank("site_type") {
                    push_missing("site_type");
                }
                if blank("cache_goal") {
                    push_missing("cache_goal");
                }
            }
            GoalTopic::Security => {
                if blank("protected_path") {
                    push_missing("protected_path");
                }
                if blank("traffic") {
                    push_missing("traffic");
                }
            }
            GoalTopic::General => {}
        }

        // only question scopes when security controls are actually in play
        let should_validate_scopes = plan.topic == GoalTopic::Security
            || !plan.cloudflare_config.waf.managed_rules.trim().is_empty()
            || !plan.cloudflare_config.rate_limiting.threshold.trim().is_empty();

        if should_validate_scopes {
            if !is_valid_scope(&plan.cloudflare_config.waf.scope) {
                plan.cloudflare_config.waf.scope = String::new();
                missing.push("waf_scope".to_string());
            }
            if !is_valid_scope(&plan.cloudflare_config.rate_limiting.scope) {
                plan.cloudflare_config.rate_limiting.scope = String::new();
                missing.push("rate_scope".to_string());
            }
        }

        let should_ask = intent.intent != IntentLabel::Explain
            && (intent.needs_clarification
                || !classification.in_scope
                || classification.topic == GoalTopic::General
                || !missing.is_empty());

        if should_ask {
            let questions = generate_followups(
                self.llm.as_ref(),
                &FollowUpRequest {
                    goal: intent_focus,
                    topic: plan.topic,
                    intent: IntentLabel::Configure,
                    answers,
                    missing: &missing,
                },
            )
            .await?;
            plan.follow_up_questions = questions.into_iter().take(2).collect();
        }

        let pending_questions = plan.follow_up_questions.clone();
        let last_plan_json = serde_json::to_string_pretty(&plan)?;

        Ok(GeneratePlanOutcome {
            plan,
            pending_questions,
            last_plan_json,
        })
    }
}

fn empty_goal_outcome(rollout: &[String], metrics: &[String]) -> GeneratePlanOutcome {
    let template = json!({
        "topic": "general",
        "chat_response": {
            "title": "Cloudflare Config Assistant",
            "summary": "Set a goal first.",
            "sections": [
                {
                    "heading": "Next",
                    "bullets": ["Type what you want to do on Cloudflare (e.g., migrate DNS, secure /api/login)."],
                    "checklist": [],
                    "steps": [],
                    "actions": []
                }
            ]
        },
        "dns_plan": {"records_to_verify": [], "email_dns_notes": [], "dnssec_steps": [], "proxy_rules_of_thumb": []},
        "summary": "Set a goal first via /api/set-goal",
        "assumptions": [],
        "recommendations": {"waf": [], "rate_limiting": [], "cache_rules": [], "bot_mitigation": [], "zero_trust": []},
        "cloudflare_config": {
            "waf": {"managed_rules": "", "sensitivity": "", "mode": "log", "scope": ""},
            "rate_limiting": {"threshold": "", "window": "", "action": "managed_challenge", "scope": ""},
            "cache_rules": {"bypass_paths": [], "cache_paths": []}
        },
        "rollout": rollout,
        "metrics": metrics,
        "follow_up_questions": [{"key": "goal", "question": "What are you trying to do on Cloudflare?"}]
    });

    let plan = normalize_plan(
        &template,
        &NormalizeOptions {
            intent: IntentLabel::Configure,
            default_rollout: rollout.to_vec(),
            default_metrics: metrics.to_vec(),
            sources: Vec::new(),
        },
    );
    let pending_questions = plan.follow_up_questions.clone();
    let last_plan_json =
        serde_json::to_string_pretty(&plan).unwrap_or_else(|_| "{}".to_string());

    GeneratePlanOutcome {
        plan,
        pending_questions,
        last_plan_json,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use crate::retrieval::StaticRetriever;

    fn generator(llm: MockLlm, retriever: StaticRetriever) -> PlanGenerator {
        PlanGenerator::new(Arc::new(llm), Arc::new(retriever))
    }

    fn state_with_goal(goal: &str) -> SessionState {
        SessionState {
            goal: Some(goal.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_goal_yields_prompt_plan() {
        let gen = generator(MockLlm::new(), StaticRetriever::empty());

        let out = gen.generate(&SessionState::default()).await.unwrap();
        assert_eq!(out.plan.topic, GoalTopic::General);
        assert_eq!(out.plan.summary, "Set a goal first via /api/set-goal");
        assert_eq!(out.pending_questions.len(), 1);
        assert_eq!(out.pending_questions[0].key, "goal");
        assert_eq!(out.plan.rollout.len(), 3);
        assert_eq!(out.plan.metrics.len(), 4);
    }

    #[tokio::test]
    async fn test_all_failures_pick_topic_fallback() {
        // unscripted mock never returns JSON: synthesis, retry, and repair
        // all fail, and the dns goal selects the dns template
        let gen = generator(MockLlm::new(), StaticRetriever::empty());
        let state = state_with_goal("migrate my dns records");

        let out = gen.generate(&state).await.unwrap();
        assert_eq!(out.plan.topic, GoalTopic::Dns);
        assert_eq!(out.plan.summary, "DNS hardening plan (fallback)");
        assert!(out.plan.used_retry);
        assert!(out.plan.raw.is_some());
        assert!(!out.plan.dns_plan.dnssec_steps.is_empty());
        // dns_provider and email_dns are unanswered but the question call
        // also fails, so no questions surface
        assert!(out.pending_questions.is_empty());
    }

    #[tokio::test]
    async fn test_login_goal_gets_safe_security_plan() {
        let plan_json = serde_json::json!({
            "topic": "performance",
            "chat_response": {"title": "Lock it down", "summary": "Protect the login endpoint.", "sections": [
                {"heading": "Steps", "bullets": ["Enable WAF"], "checklist": [], "steps": [], "actions": []}
            ]},
            "cloudflare_config": {
                "waf": {"managed_rules": "Cloudflare Managed Ruleset", "sensitivity": "high", "mode": "block", "scope": "all"},
                "rate_limiting": {"threshold": "50", "window": "60s", "action": "block", "scope": "all"},
                "cache_rules": {"bypass_paths": [], "cache_paths": []}
            },
            "rollout": ["a", "b", "c"],
            "metrics": ["a", "b", "c", "d"]
        })
        .to_string();

        let llm = MockLlm::scripted(vec![
            r#"{"intent":"configure","needs_clarification":false}"#.to_string(),
            plan_json,
            r#"{"follow_up_questions":[{"key":"traffic","question":"Roughly how much login traffic do you expect?"}]}"#
                .to_string(),
        ]);
        let gen = generator(llm, StaticRetriever::seeded());
        let state = state_with_goal("secure my /api/login");

        let out = gen.generate(&state).await.unwrap();
        let plan = &out.plan;

        assert_eq!(plan.topic, GoalTopic::Security);
        assert_eq!(plan.cloudflare_config.waf.mode, "log");
        assert_eq!(plan.cloudflare_config.rate_limiting.action, "managed_challenge");
        assert_eq!(plan.cloudflare_config.waf.scope, policy::LOGIN_SCOPE);
        assert_eq!(plan.cloudflare_config.rate_limiting.scope, policy::LOGIN_SCOPE);
        assert!(plan
            .cloudflare_config
            .cache_rules
            .bypass_paths
            .iter()
            .any(|p| p == "/api/login"));
        assert!(!plan.used_retry);

        // sources narrowed to security products from the seeded corpus
        assert!(plan
            .sources
            .iter()
            .all(|s| s.contains("/waf/") || s.contains("/bots/")));

        // protected_path and traffic are unanswered, so questions surface
        assert_eq!(out.pending_questions.len(), 1);
        assert_eq!(out.pending_questions[0].key, "traffic");
        assert_eq!(out.last_plan_json, serde_json::to_string_pretty(plan).unwrap());
    }

    #[tokio::test]
    async fn test_explain_intent_suppresses_questions_and_stages() {
        let plan_json = serde_json::json!({
            "topic": "security",
            "chat_response": {"title": "WAF", "summary": "A WAF filters requests.", "sections": [
                {"heading": "Overview", "bullets": ["Inspects traffic"], "checklist": [], "steps": [], "actions": []}
            ]}
        })
        .to_string();

        let llm = MockLlm::scripted(vec![
            r#"{"intent":"explain","needs_clarification":false}"#.to_string(),
            plan_json,
        ]);
        let gen = generator(llm, StaticRetriever::seeded());
        let state = state_with_goal("what is a waf?");

        let out = gen.generate(&state).await.unwrap();
        assert!(out.plan.rollout.is_empty());
        assert!(out.plan.metrics.is_empty());
        assert!(out.pending_questions.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_scope_is_cleared_and_flagged() {
        let plan_json = serde_json::json!({
            "topic": "security",
            "chat_response": {"title": "Rate limit", "summary": "Throttle abuse.", "sections": []},
            "cloudflare_config": {
                "waf": {"managed_rules": "Cloudflare Managed Ruleset", "sensitivity": "medium", "mode": "log", "scope": "everywhere"},
                "rate_limiting": {"threshold": "100", "window": "60s", "action": "managed_challenge", "scope": r#"http.request.uri.path starts_with "/api""#},
                "cache_rules": {"bypass_paths": [], "cache_paths": []}
            },
            "rollout": ["a", "b", "c"],
            "metrics": ["a", "b", "c", "d"]
        })
        .to_string();

        let llm = MockLlm::scripted(vec![
            r#"{"intent":"configure","needs_clarification":false}"#.to_string(),
            plan_json,
            r#"{"follow_up_questions":[{"key":"waf_scope","question":"Which path should the WAF rules cover?"}]}"#
                .to_string(),
        ]);
        let gen = generator(llm, StaticRetriever::seeded());
        let state = state_with_goal("add rate limiting for api abuse");

        let out = gen.generate(&state).await.unwrap();
        assert_eq!(out.plan.cloudflare_config.waf.scope, "");
        assert_eq!(
            out.plan.cloudflare_config.rate_limiting.scope,
            r#"http.request.uri.path starts_with "/api""#
        );
        assert_eq!(out.pending_questions.len(), 1);
        assert_eq!(out.pending_questions[0].key, "waf_scope");
    }
}
