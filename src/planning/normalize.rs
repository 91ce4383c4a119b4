//! Plan normalization
//!
//! Total, deterministic coercion of an arbitrary JSON object into the
//! canonical `Plan`. Missing or mistyped fields get defaults, bounded lists
//! are clamped by truncation (never by error), and the function is
//! idempotent: normalizing an already-normalized plan yields the same plan.

use crate::models::{
    ActionLink, ChatResponse, ChecklistItem, DnsPlan, DnsRecord, EdgeConfig, GoalTopic,
    IntentLabel, PendingQuestion, Plan, RateLimitConfig, Recommendations, Section, StepGuide,
    WafConfig,
};
use crate::planning::sources::is_url;
use serde_json::Value;

pub struct NormalizeOptions {
    pub intent: IntentLabel,
    pub default_rollout: Vec<String>,
    pub default_metrics: Vec<String>,
    pub sources: Vec<String>,
}

fn string_of(v: Option<&Value>, default: &str) -> String {
    match v.and_then(|v| v.as_str()) {
        Some(s) => s.to_string(),
        None => default.to_string(),
    }
}

/// String entries only; everything else is dropped.
fn strings(v: Option<&Value>) -> Vec<String> {
    v.and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|x| x.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Scalars coerced to their string form (path lists tolerate sloppy output).
fn coerced_strings(v: Option<&Value>) -> Vec<String> {
    v.and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .map(|x| match x {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn clamped<T>(mut items: Vec<T>, max: usize) -> Vec<T> {
    items.truncate(max);
    items
}

fn normalize_topic(v: Option<&Value>) -> GoalTopic {
    v.and_then(|v| v.as_str())
        .and_then(GoalTopic::parse)
        .unwrap_or(GoalTopic::General)
}

fn normalize_section(s: &Value) -> Section {
    let steps = s
        .get("steps")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .map(|step| StepGuide {
                    step: step.get("step").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                    title: string_of(step.get("title"), ""),
                    details: strings(step.get("details")),
                })
                .collect()
        })
        .unwrap_or_default();

    let checklist = s
        .get("checklist")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .map(|item| ChecklistItem {
                    text: string_of(item.get("text"), ""),
                    done_by_user: item
                        .get("done_by_user")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false),
                })
                .collect()
        })
        .unwrap_or_default();

    let actions = s
        .get("actions")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .map(|a| ActionLink {
                    label: string_of(a.get("label"), ""),
                    url: string_of(a.get("url"), ""),
                })
                .collect()
        })
        .unwrap_or_default();

    Section {
        heading: string_of(s.get("heading"), ""),
        bullets: clamped(strings(s.get("bullets")), 6),
        checklist: clamped(checklist, 8),
        steps: clamped(steps, 8),
        actions: clamped(actions, 4),
    }
}

fn normalize_chat(v: Option<&Value>) -> ChatResponse {
    let sections = v
        .and_then(|c| c.get("sections"))
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().take(4).map(normalize_section).collect())
        .unwrap_or_default();

    ChatResponse {
        title: string_of(v.and_then(|c| c.get("title")), "Plan"),
        summary: string_of(v.and_then(|c| c.get("summary")), ""),
        sections,
    }
}

fn normalize_dns_plan(v: Option<&Value>) -> DnsPlan {
    let records = v
        .and_then(|d| d.get("records_to_verify"))
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .take(10)
                .map(|r| DnsRecord {
                    record_type: string_of(r.get("type"), ""),
                    name: string_of(r.get("name"), ""),
                    target: string_of(r.get("target"), ""),
                    proxy: string_of(r.get("proxy"), "unknown"),
                })
                .collect()
        })
        .unwrap_or_default();

    DnsPlan {
        records_to_verify: records,
        email_dns_notes: clamped(strings(v.and_then(|d| d.get("email_dns_notes"))), 8),
        dnssec_steps: clamped(strings(v.and_then(|d| d.get("dnssec_steps"))), 8),
        proxy_rules_of_thumb: clamped(strings(v.and_then(|d| d.get("proxy_rules_of_thumb"))), 8),
    }
}

fn normalize_follow_ups(v: Option<&Value>) -> Vec<PendingQuestion> {
    v.and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .map(|q| PendingQuestion {
                    key: string_of(q.get("key"), ""),
                    question: string_of(q.get("question"), ""),
                })
                .filter(|q| !q.key.is_empty() && !q.question.is_empty())
                .take(2)
                .collect()
        })
        .unwrap_or_default()
}

/// Coerce a raw model/fallback object into the canonical plan shape.
pub fn normalize_plan(p: &Value, opts: &NormalizeOptions) -> Plan {
    let recs = p.get("recommendations");
    let config = p.get("cloudflare_config");
    let waf = config.and_then(|c| c.get("waf"));
    let rate_limiting = config.and_then(|c| c.get("rate_limiting"));
    let cache_rules = config.and_then(|c| c.get("cache_rules"));

    let mut out = Plan {
        topic: normalize_topic(p.get("topic")),
        chat_response: normalize_chat(p.get("chat_response")),
        dns_plan: normalize_dns_plan(p.get("dns_plan")),

        summary: string_of(p.get("summary"), "Cloudflare configuration recommendations"),
        assumptions: clamped(strings(p.get("assumptions")), 3),

        recommendations: Recommendations {
            waf: clamped(strings(recs.and_then(|r| r.get("waf"))), 2),
            rate_limiting: clamped(strings(recs.and_then(|r| r.get("rate_limiting"))), 2),
            cache_rules: clamped(strings(recs.and_then(|r| r.get("cache_rules"))), 2),
            bot_mitigation: clamped(strings(recs.and_then(|r| r.get("bot_mitigation"))), 2),
            zero_trust: clamped(strings(recs.and_then(|r| r.get("zero_trust"))), 2),
        },

        cloudflare_config: EdgeConfig {
            waf: WafConfig {
                managed_rules: string_of(waf.and_then(|w| w.get("managed_rules")), ""),
                sensitivity: string_of(waf.and_then(|w| w.get("sensitivity")), ""),
                mode: string_of(waf.and_then(|w| w.get("mode")), "log"),
                scope: string_of(waf.and_then(|w| w.get("scope")), ""),
            },
            rate_limiting: RateLimitConfig {
                threshold: string_of(rate_limiting.and_then(|r| r.get("threshold")), ""),
                window: string_of(rate_limiting.and_then(|r| r.get("window")), ""),
                action: string_of(
                    rate_limiting.and_then(|r| r.get("action")),
                    "managed_challenge",
                ),
                scope: string_of(rate_limiting.and_then(|r| r.get("scope")), ""),
            },
            cache_rules: crate::models::CacheRules {
                bypass_paths: coerced_strings(cache_rules.and_then(|c| c.get("bypass_paths"))),
                cache_paths: coerced_strings(cache_rules.and_then(|c| c.get("cache_paths"))),
            },
        },

        rollout: strings(p.get("rollout")),
        metrics: strings(p.get("metrics")),
        follow_up_questions: normalize_follow_ups(p.get("follow_up_questions")),
        sources: opts
            .sources
            .iter()
            .filter(|s| is_url(s))
            .take(5)
            .cloned()
            .collect(),
        used_retry: false,
        raw: None,
    };

    if opts.intent == IntentLabel::Explain {
        for section in &mut out.chat_response.sections {
            section.steps.clear();
            section.checklist.clear();
        }
        out.rollout.clear();
        out.metrics.clear();
    } else {
        if out.rollout.len() != 3 {
            out.rollout = opts.default_rollout.clone();
        }
        if out.metrics.len() != 4 {
            out.metrics = opts.default_metrics.clone();
        }
    }

    out
}
