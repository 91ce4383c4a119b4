//! Core data models for the config assistant
//!
//! The `Plan` tree is the canonical output schema: its shape is identical
//! across every success and fallback path, so callers never branch on which
//! path produced a field.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

//
// ================= Enums =================
//

/// Coarse subject-matter bucket for a goal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoalTopic {
    Dns,
    Security,
    Workers,
    Performance,
    General,
}

impl GoalTopic {
    pub fn parse(s: &str) -> Option<GoalTopic> {
        match s {
            "dns" => Some(GoalTopic::Dns),
            "security" => Some(GoalTopic::Security),
            "workers" => Some(GoalTopic::Workers),
            "performance" => Some(GoalTopic::Performance),
            "general" => Some(GoalTopic::General),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalTopic::Dns => "dns",
            GoalTopic::Security => "security",
            GoalTopic::Workers => "workers",
            GoalTopic::Performance => "performance",
            GoalTopic::General => "general",
        }
    }
}

impl fmt::Display for GoalTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of help the user is asking for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntentLabel {
    Explain,
    Configure,
    Troubleshoot,
    Unknown,
}

impl IntentLabel {
    pub fn parse(s: &str) -> Option<IntentLabel> {
        match s {
            "explain" => Some(IntentLabel::Explain),
            "configure" => Some(IntentLabel::Configure),
            "troubleshoot" => Some(IntentLabel::Troubleshoot),
            "unknown" => Some(IntentLabel::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentLabel::Explain => "explain",
            IntentLabel::Configure => "configure",
            IntentLabel::Troubleshoot => "troubleshoot",
            IntentLabel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= Classification Results =================
//

/// Derived from the goal text; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalClassification {
    pub topic: GoalTopic,
    pub in_scope: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentResult {
    pub intent: IntentLabel,
    pub needs_clarification: bool,
    pub clarifying_question: Option<String>,
}

//
// ================= Session State =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingQuestion {
    pub key: String,
    pub question: String,
}

/// One record per conversation key.
///
/// Setting a new goal is a hard reset: answers, followups, pending questions,
/// and the cached plan are all cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub answers: HashMap<String, String>,
    #[serde(default)]
    pub followups: Vec<String>,
    #[serde(default)]
    pub pending_questions: Vec<PendingQuestion>,
    #[serde(default)]
    pub last_plan: Option<String>,
}

//
// ================= Plan Schema =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChecklistItem {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub done_by_user: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StepGuide {
    #[serde(default)]
    pub step: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActionLink {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Section {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub steps: Vec<StepGuide>,
    #[serde(default)]
    pub actions: Vec<ActionLink>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DnsRecord {
    #[serde(rename = "type", default)]
    pub record_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub proxy: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DnsPlan {
    #[serde(default)]
    pub records_to_verify: Vec<DnsRecord>,
    #[serde(default)]
    pub email_dns_notes: Vec<String>,
    #[serde(default)]
    pub dnssec_steps: Vec<String>,
    #[serde(default)]
    pub proxy_rules_of_thumb: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Recommendations {
    #[serde(default)]
    pub waf: Vec<String>,
    #[serde(default)]
    pub rate_limiting: Vec<String>,
    #[serde(default)]
    pub cache_rules: Vec<String>,
    #[serde(default)]
    pub bot_mitigation: Vec<String>,
    #[serde(default)]
    pub zero_trust: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WafConfig {
    #[serde(default)]
    pub managed_rules: String,
    #[serde(default)]
    pub sensitivity: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub scope: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub threshold: String,
    #[serde(default)]
    pub window: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub scope: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CacheRules {
    #[serde(default)]
    pub bypass_paths: Vec<String>,
    #[serde(default)]
    pub cache_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EdgeConfig {
    #[serde(default)]
    pub waf: WafConfig,
    #[serde(default)]
    pub rate_limiting: RateLimitConfig,
    #[serde(default)]
    pub cache_rules: CacheRules,
}

/// Canonical plan output, fully re-derived on every generate call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub topic: GoalTopic,
    pub chat_response: ChatResponse,
    pub dns_plan: DnsPlan,
    pub summary: String,
    pub assumptions: Vec<String>,
    pub recommendations: Recommendations,
    pub cloudflare_config: EdgeConfig,
    pub rollout: Vec<String>,
    pub metrics: Vec<String>,
    pub follow_up_questions: Vec<PendingQuestion>,
    pub sources: Vec<String>,
    /// Whether the strict-JSON retry call was needed. Observability only.
    #[serde(default)]
    pub used_retry: bool,
    /// Truncated raw model text, attached on the fallback path only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}
