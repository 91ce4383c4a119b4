//! Deterministic safety-policy enforcement
//!
//! Applied after normalization and independent of model cooperation: the
//! generative step cannot be trusted to honor safety constraints, so this
//! layer is the final, non-bypassable gate. Never regresses to unsafe
//! defaults (e.g. blocking a login endpoint outright).

use crate::models::{GoalTopic, IntentLabel, Plan};
use lazy_static::lazy_static;
use regex::Regex;

pub const LOGIN_SCOPE: &str = r#"http.request.uri.path starts_with "/api/login""#;
pub const LOGIN_PATH: &str = "/api/login";

lazy_static! {
    static ref AUTH_GOAL: Regex =
        Regex::new(r"(?i)/api/login|/login|auth").expect("Failed to compile auth pattern");
    static ref SCOPE_STARTS_WITH: Regex = Regex::new(
        r#"^http\.request\.uri\.path\s+starts_with\s+"/[^"]*"$"#
    )
    .expect("Failed to compile scope pattern");
    static ref SCOPE_EQ: Regex = Regex::new(r#"^http\.request\.uri\.path\s+eq\s+"/[^"]*"$"#)
        .expect("Failed to compile scope pattern");
}

/// Restricted path-matching predicate accepted for WAF/rate-limit scopes.
/// Empty means "unset" and is allowed; anything else must be an exact
/// quoted-path expression.
pub fn is_valid_scope(s: &str) -> bool {
    let t = s.trim();
    t.is_empty() || SCOPE_STARTS_WITH.is_match(t) || SCOPE_EQ.is_match(t)
}

pub struct PolicyContext<'a> {
    pub goal: &'a str,
    pub intent: IntentLabel,
    pub default_rollout: &'a [String],
    pub default_metrics: &'a [String],
}

/// Apply the non-negotiable rules, overriding whatever the model produced.
pub fn enforce_policy(plan: &mut Plan, ctx: &PolicyContext<'_>) {
    // safety default: always start in log, never auto-enforce
    plan.cloudflare_config.waf.mode = "log".to_string();

    if AUTH_GOAL.is_match(ctx.goal) {
        plan.topic = GoalTopic::Security;
        plan.cloudflare_config.waf.scope = LOGIN_SCOPE.to_string();
        plan.cloudflare_config.rate_limiting.scope = LOGIN_SCOPE.to_string();

        let action = plan.cloudflare_config.rate_limiting.action.to_lowercase();
        if action.is_empty() || action == "block" {
            plan.cloudflare_config.rate_limiting.action = "managed_challenge".to_string();
        }

        let bypass = &mut plan.cloudflare_config.cache_rules.bypass_paths;
        if !bypass.iter().any(|p| p == LOGIN_PATH) {
            bypass.push(LOGIN_PATH.to_string());
        }
    }

    // final backstop for the rollout/metrics length invariants
    if ctx.intent != IntentLabel::Explain {
        if plan.rollout.len() != 3 {
            plan.rollout = ctx.default_rollout.to_vec();
        }
        if plan.metrics.len() != 4 {
            plan.metrics = ctx.default_metrics.to_vec();
        }
    } else {
        plan.rollout.clear();
        plan.metrics.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::normalize::{normalize_plan, NormalizeOptions};
    use crate::planning::{default_metrics, default_rollout};
    use serde_json::json;

    fn ctx<'a>(goal: &'a str, intent: IntentLabel, rollout: &'a [String], metrics: &'a [String]) -> PolicyContext<'a> {
        PolicyContext {
            goal,
            intent,
            default_rollout: rollout,
            default_metrics: metrics,
        }
    }

    fn base_plan(raw: serde_json::Value) -> Plan {
        normalize_plan(
            &raw,
            &NormalizeOptions {
                intent: IntentLabel::Configure,
                default_rollout: default_rollout(),
                default_metrics: default_metrics(),
                sources: vec![],
            },
        )
    }

    #[test]
    fn test_scope_expressions() {
        assert!(is_valid_scope(""));
        assert!(is_valid_scope("  "));
        assert!(is_valid_scope(r#"http.request.uri.path starts_with "/api/login""#));
        assert!(is_valid_scope(r#"http.request.uri.path eq "/x""#));

        assert!(!is_valid_scope("all"));
        assert!(!is_valid_scope("http.request.uri.path starts_with /api/login"));
        assert!(!is_valid_scope(r#"http.request.uri.path contains "/x""#));
        assert!(!is_valid_scope(r#"http.request.uri.path eq "x""#));
    }

    #[test]
    fn test_waf_mode_always_forced_to_log() {
        let rollout = default_rollout();
        let metrics = default_metrics();
        let mut plan = base_plan(json!({"cloudflare_config": {"waf": {"mode": "block"}}}));

        enforce_policy(&mut plan, &ctx("speed up my blog", IntentLabel::Configure, &rollout, &metrics));
        assert_eq!(plan.cloudflare_config.waf.mode, "log");
    }

    #[test]
    fn test_login_goal_forces_security_posture() {
        let rollout = default_rollout();
        let metrics = default_metrics();
        let mut plan = base_plan(json!({
            "topic": "performance",
            "cloudflare_config": {
                "rate_limiting": {"action": "block", "scope": "all"},
                "cache_rules": {"bypass_paths": ["/admin", "/api/login"]}
            }
        }));

        enforce_policy(&mut plan, &ctx("secure my /api/login", IntentLabel::Configure, &rollout, &metrics));

        assert_eq!(plan.topic, GoalTopic::Security);
        assert_eq!(plan.cloudflare_config.waf.scope, LOGIN_SCOPE);
        assert_eq!(plan.cloudflare_config.rate_limiting.scope, LOGIN_SCOPE);
        assert_eq!(plan.cloudflare_config.rate_limiting.action, "managed_challenge");
        // union, de-duplicated
        assert_eq!(
            plan.cloudflare_config.cache_rules.bypass_paths,
            vec!["/admin", "/api/login"]
        );
    }

    #[test]
    fn test_non_block_action_is_preserved() {
        let rollout = default_rollout();
        let metrics = default_metrics();
        let mut plan = base_plan(json!({
            "cloudflare_config": {"rate_limiting": {"action": "js_challenge"}}
        }));

        enforce_policy(&mut plan, &ctx("protect the /login page", IntentLabel::Configure, &rollout, &metrics));
        assert_eq!(plan.cloudflare_config.rate_limiting.action, "js_challenge");
    }

    #[test]
    fn test_explain_intent_empties_rollout_and_metrics() {
        let rollout = default_rollout();
        let metrics = default_metrics();
        let mut plan = base_plan(json!({"rollout": ["a", "b", "c"], "metrics": ["a", "b", "c", "d"]}));

        enforce_policy(&mut plan, &ctx("what is auth?", IntentLabel::Explain, &rollout, &metrics));
        assert!(plan.rollout.is_empty());
        assert!(plan.metrics.is_empty());
    }
}
