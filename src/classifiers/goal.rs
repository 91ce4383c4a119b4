//! Goal classifier
//!
//! Pure function mapping free goal text to a coarse topic plus an in-scope
//! flag. Topic priority on multiple matches is fixed: dns > workers >
//! performance > security.

use crate::models::{GoalClassification, GoalTopic};
use lazy_static::lazy_static;
use regex::RegexSet;

fn set(patterns: &[&str]) -> RegexSet {
    RegexSet::new(patterns).expect("Failed to compile keyword patterns")
}

lazy_static! {
    /// Generic platform terms: mentions of these put a goal in scope even
    /// when no specific topic matches.
    static ref PLATFORM_KEYWORDS: RegexSet = set(&[
        r"(?i)\bcloudflare\b",
        r"(?i)\bcdn\b",
        r"(?i)\bwaf\b",
        r"(?i)\bdns\b",
        r"(?i)\bworkers?\b",
        r"(?i)\bpages\b",
        r"(?i)\bkv\b",
        r"(?i)\br2\b",
        r"(?i)\bd1\b",
        r"(?i)\bcache\b",
        r"(?i)\bssl\b",
        r"(?i)\btls\b",
        r"(?i)\bbots?\b",
        r"(?i)\brate limit(?:ing)?\b",
        r"(?i)\bfirewall\b",
        r"(?i)\bzero trust\b",
        r"(?i)\baccess\b",
        r"(?i)\bzone\b",
        r"(?i)\bnameserver\b",
        r"(?i)\bregistrar\b",
        r"(?i)\bload balanc(?:ing|er)\b",
    ]);

    static ref DNS_KEYWORDS: RegexSet = set(&[
        r"(?i)\bdns\b",
        r"(?i)\bnameserver\b",
        r"(?i)\bzone\b",
        r"(?i)\bmx\b",
        r"(?i)\bspf\b",
        r"(?i)\bdkim\b",
        r"(?i)\bdmarc\b",
        r"(?i)\bdnssec\b",
        r"(?i)\brecord\b",
        r"(?i)\bmail\b",
        r"(?i)\bemail\b",
        r"(?i)\bmailbox\b",
        r"(?i)\bgmail\b",
        r"(?i)\bgoogle workspace\b",
        r"(?i)\bmx record\b",
    ]);

    static ref WORKERS_KEYWORDS: RegexSet = set(&[
        r"(?i)\bworkers?\b",
        r"(?i)\bdurable object\b",
        r"(?i)\bkv\b",
        r"(?i)\bd1\b",
        r"(?i)\br2\b",
        r"(?i)\bpages\b",
        r"(?i)\bqueues?\b",
    ]);

    static ref PERF_KEYWORDS: RegexSet = set(&[
        r"(?i)\bcache\b",
        r"(?i)\bcaching\b",
        r"(?i)\bcdn\b",
        r"(?i)\blatency\b",
        r"(?i)\bperformance\b",
        r"(?i)\boptimi[sz]e\b",
        r"(?i)\bspeed\b",
    ]);

    static ref SECURITY_KEYWORDS: RegexSet = set(&[
        r"(?i)\bwaf\b",
        r"(?i)\bbot\b",
        r"(?i)\bddos\b",
        r"(?i)\brate limit(?:ing)?\b",
        r"(?i)\bfirewall\b",
        r"(?i)\baccess\b",
        r"(?i)\bzero trust\b",
        r"(?i)\bapi abuse\b",
        r"(?i)\bblock\b",
        r"(?i)\bchallenge\b",
    ]);

    /// Named competitor products/services. These alone mark a goal
    /// out of scope unless a generic platform term is also present.
    static ref OUT_OF_SCOPE_KEYWORDS: RegexSet = set(&[
        r"(?i)\bgmail\b",
        r"(?i)\bgoogle workspace\b",
        r"(?i)\bgsuite\b",
        r"(?i)\baws\b",
        r"(?i)\bazure\b",
        r"(?i)\bgcp\b",
        r"(?i)\bgithub\b",
        r"(?i)\bnetlify\b",
        r"(?i)\bvercel\b",
        r"(?i)\bshopify\b",
        r"(?i)\bwordpress\b",
        r"(?i)\bsquarespace\b",
        r"(?i)\bwix\b",
        r"(?i)\bmailbox\b",
        r"(?i)\boutlook\b",
        r"(?i)\boffice 365\b",
        r"(?i)\bmicrosoft 365\b",
    ]);
}

/// Classify goal text into a topic + in-scope flag.
pub fn classify_goal(goal_text: &str) -> GoalClassification {
    let g = goal_text.to_lowercase();
    if g.trim().is_empty() {
        return GoalClassification {
            topic: GoalTopic::General,
            in_scope: false,
        };
    }

    let dns = DNS_KEYWORDS.is_match(&g);
    let workers = WORKERS_KEYWORDS.is_match(&g);
    let performance = PERF_KEYWORDS.is_match(&g);
    let security = SECURITY_KEYWORDS.is_match(&g);
    let platform = PLATFORM_KEYWORDS.is_match(&g);
    let out_of_scope = OUT_OF_SCOPE_KEYWORDS.is_match(&g);

    // topic priority
    if dns {
        return GoalClassification { topic: GoalTopic::Dns, in_scope: true };
    }
    if workers {
        return GoalClassification { topic: GoalTopic::Workers, in_scope: true };
    }
    if performance {
        return GoalClassification { topic: GoalTopic::Performance, in_scope: true };
    }
    if security {
        return GoalClassification { topic: GoalTopic::Security, in_scope: true };
    }

    // not clearly ours but mentions outside systems: out of scope
    if !platform && out_of_scope {
        return GoalClassification {
            topic: GoalTopic::General,
            in_scope: false,
        };
    }

    GoalClassification {
        topic: GoalTopic::General,
        in_scope: platform,
    }
}

/// Topic from the deterministic classifier, or `None` when it stays general.
pub fn infer_topic(goal_text: &str) -> Option<GoalTopic> {
    let c = classify_goal(goal_text);
    if c.topic == GoalTopic::General {
        None
    } else {
        Some(c.topic)
    }
}
