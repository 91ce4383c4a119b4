//! Topic-aware source selection

use crate::models::GoalTopic;
use crate::retrieval::DocMatch;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref URL_PATTERN: Regex =
        Regex::new(r"(?i)^https?://\S+$").expect("Failed to compile URL pattern");
}

pub fn is_url(u: &str) -> bool {
    URL_PATTERN.is_match(u)
}

/// Product tags that count as on-topic for each resolved topic.
fn allowed_products(topic: GoalTopic) -> &'static [&'static str] {
    match topic {
        GoalTopic::Dns => &["DNS", "Registrar", "SSL/TLS"],
        GoalTopic::Security => &["WAF", "DDoS", "Bots", "Firewall", "Zero Trust", "Access"],
        GoalTopic::Workers => &["Workers", "Pages", "R2", "KV", "D1"],
        GoalTopic::Performance => &["Caching", "Performance", "Rules"],
        GoalTopic::General => &[],
    }
}

fn capped_urls(sources: &[String]) -> Vec<String> {
    sources
        .iter()
        .filter(|s| is_url(s))
        .take(5)
        .cloned()
        .collect()
}

/// Prefer retrieved documents whose product tag belongs to the topic's
/// allow-list; fall back to the unfiltered URL-validated list when nothing
/// matches. Always capped at 5, de-duplicated, order-preserving.
pub fn filter_sources_by_topic(
    topic: GoalTopic,
    sources: &[String],
    matches: &[DocMatch],
) -> Vec<String> {
    let tags = allowed_products(topic);
    if matches.is_empty() || tags.is_empty() {
        return capped_urls(sources);
    }

    let mut filtered: Vec<String> = Vec::new();
    for m in matches {
        if tags.contains(&m.product.as_str()) && is_url(&m.url) && !filtered.contains(&m.url) {
            filtered.push(m.url.clone());
        }
    }

    if filtered.is_empty() {
        return capped_urls(sources);
    }
    filtered.truncate(5);
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(product: &str, url: &str) -> DocMatch {
        DocMatch {
            score: 0.5,
            url: url.to_string(),
            title: "doc".to_string(),
            product: product.to_string(),
            excerpt: String::new(),
        }
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://developers.cloudflare.com/waf/"));
        assert!(is_url("http://example.com/x"));
        assert!(!is_url("developers.cloudflare.com/waf/"));
        assert!(!is_url("https://has a space.com"));
    }

    #[test]
    fn test_filters_to_topic_products() {
        let matches = vec![
            doc("WAF", "https://a.example/waf"),
            doc("Caching", "https://a.example/cache"),
            doc("Bots", "https://a.example/bots"),
        ];
        let sources = vec!["https://a.example/other".to_string()];

        let out = filter_sources_by_topic(GoalTopic::Security, &sources, &matches);
        assert_eq!(out, vec!["https://a.example/waf", "https://a.example/bots"]);
    }

    #[test]
    fn test_no_tag_match_falls_back_to_source_list() {
        let matches = vec![doc("Caching", "https://a.example/cache")];
        let sources = vec![
            "https://a.example/one".to_string(),
            "not-a-url".to_string(),
        ];

        let out = filter_sources_by_topic(GoalTopic::Dns, &sources, &matches);
        assert_eq!(out, vec!["https://a.example/one"]);
    }

    #[test]
    fn test_general_topic_uses_unfiltered_list() {
        let matches = vec![doc("WAF", "https://a.example/waf")];
        let sources: Vec<String> = (0..8)
            .map(|i| format!("https://a.example/{}", i))
            .collect();

        let out = filter_sources_by_topic(GoalTopic::General, &sources, &matches);
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], "https://a.example/0");
    }

    #[test]
    fn test_deduplicates_match_urls() {
        let matches = vec![
            doc("WAF", "https://a.example/waf"),
            doc("WAF", "https://a.example/waf"),
        ];
        let out = filter_sources_by_topic(GoalTopic::Security, &[], &matches);
        assert_eq!(out.len(), 1);
    }
}
