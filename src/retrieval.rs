//! Context retrieval collaborator
//!
//! Document retrieval (embedding, vector search, fetching) lives outside
//! this engine; the core only depends on the narrow `ContextRetriever`
//! interface. `HttpRetriever` talks to a docs-search service over HTTP and
//! applies the low-confidence fallback source set; `StaticRetriever` keeps
//! the system functional without one.

use crate::error::AssistantError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Similarity score below which the retriever pads results with the
/// fixed fallback source set.
pub const LOW_CONFIDENCE_SCORE: f64 = 0.15;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocMatch {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub excerpt: String,
}

#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    pub context: String,
    pub sources: Vec<String>,
    pub matches: Vec<DocMatch>,
}

/// Trait for ranked-context retrieval (external collaborator)
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> crate::Result<RetrievedContext>;
}

/// Always-available documentation entry points, used when vector search
/// has nothing confident to offer.
const FALLBACK_DOCS: &[(&str, &str, &str)] = &[
    (
        "Fundamentals",
        "Cloudflare Fundamentals",
        "https://developers.cloudflare.com/fundamentals/",
    ),
    (
        "Fundamentals",
        "Get started",
        "https://developers.cloudflare.com/fundamentals/get-started/",
    ),
    (
        "Fundamentals",
        "How Cloudflare works",
        "https://developers.cloudflare.com/learning-paths/get-started/concepts/how-cloudflare-works/",
    ),
    (
        "Fundamentals",
        "Accounts, zones, and profiles",
        "https://developers.cloudflare.com/fundamentals/setup/accounts-and-zones/",
    ),
    (
        "Fundamentals",
        "Security",
        "https://developers.cloudflare.com/fundamentals/security/",
    ),
];

fn build_context(matches: &[DocMatch]) -> String {
    matches
        .iter()
        .filter(|m| !m.url.is_empty() && !m.title.is_empty())
        .enumerate()
        .map(|(i, m)| {
            format!(
                "Source {}: {} ({})\nURL: {}\nExcerpt: {}",
                i + 1,
                m.title,
                m.product,
                m.url,
                m.excerpt
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn with_fallback_sources(mut retrieved: RetrievedContext) -> RetrievedContext {
    let max_score = retrieved
        .matches
        .iter()
        .map(|m| m.score)
        .fold(0.0_f64, f64::max);

    if !retrieved.matches.is_empty() && max_score >= LOW_CONFIDENCE_SCORE {
        return retrieved;
    }

    let fallback_context = FALLBACK_DOCS
        .iter()
        .enumerate()
        .map(|(i, (product, title, url))| {
            format!("Fallback {}: {} ({})\nURL: {}", i + 1, title, product, url)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    retrieved.context = [retrieved.context.as_str(), fallback_context.as_str()]
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n\n");

    for (_, _, url) in FALLBACK_DOCS {
        if !retrieved.sources.iter().any(|s| s == url) {
            retrieved.sources.push((*url).to_string());
        }
    }

    retrieved
}

/// Docs-search service client.
pub struct HttpRetriever {
    client: reqwest::Client,
    search_url: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    matches: Vec<DocMatch>,
}

impl HttpRetriever {
    pub fn new(search_url: String) -> Self {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, search_url }
    }
}

#[async_trait]
impl ContextRetriever for HttpRetriever {
    async fn retrieve(&self, query: &str) -> crate::Result<RetrievedContext> {
        let request = SearchRequest { query, top_k: 5 };

        let response = self
            .client
            .post(&self.search_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Retrieval request failed: {}", e);
                AssistantError::RetrievalError(format!("Docs search error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Retrieval error response: {}", error_text);
            return Err(AssistantError::RetrievalError(format!(
                "Docs search error: {}",
                error_text
            )));
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            AssistantError::RetrievalError(format!("Docs search parse error: {}", e))
        })?;

        info!(matches = body.matches.len(), "Context retrieved");

        let retrieved = RetrievedContext {
            context: build_context(&body.matches),
            sources: body
                .matches
                .iter()
                .filter(|m| !m.url.is_empty())
                .map(|m| m.url.clone())
                .collect(),
            matches: body.matches,
        };

        Ok(with_fallback_sources(retrieved))
    }
}

/// Fixed-corpus retriever for development & testing.
pub struct StaticRetriever {
    docs: Vec<DocMatch>,
}

impl StaticRetriever {
    pub fn empty() -> Self {
        Self { docs: Vec::new() }
    }

    /// The small seed corpus covering WAF, rate limiting, caching, and bots.
    pub fn seeded() -> Self {
        let doc = |title: &str, product: &str, url: &str, excerpt: &str| DocMatch {
            score: 0.6,
            url: url.to_string(),
            title: title.to_string(),
            product: product.to_string(),
            excerpt: excerpt.to_string(),
        };

        Self {
            docs: vec![
                doc(
                    "WAF Managed Rules",
                    "WAF",
                    "https://developers.cloudflare.com/waf/managed-rules/",
                    "Managed rules protect apps from common vulns. Start by logging, then enforce after tuning.",
                ),
                doc(
                    "Rate limiting rules",
                    "WAF",
                    "https://developers.cloudflare.com/waf/rate-limiting-rules/",
                    "Rate limiting mitigates abusive traffic. Scope to endpoints like /api/login; prefer challenge actions first.",
                ),
                doc(
                    "Cache Rules",
                    "Caching",
                    "https://developers.cloudflare.com/cache/how-to/cache-rules/",
                    "Cache Rules control caching and bypass. Authentication endpoints should bypass cache.",
                ),
                doc(
                    "Bots",
                    "Bots",
                    "https://developers.cloudflare.com/bots/",
                    "Bot features detect and mitigate automated traffic with minimal user impact.",
                ),
                doc(
                    "Manage DNS records",
                    "DNS",
                    "https://developers.cloudflare.com/dns/manage-dns-records/",
                    "Create and edit DNS records; keep email records DNS-only.",
                ),
            ],
        }
    }
}

#[async_trait]
impl ContextRetriever for StaticRetriever {
    async fn retrieve(&self, _query: &str) -> crate::Result<RetrievedContext> {
        let retrieved = RetrievedContext {
            context: build_context(&self.docs),
            sources: self.docs.iter().map(|m| m.url.clone()).collect(),
            matches: self.docs.clone(),
        };
        Ok(with_fallback_sources(retrieved))
    }
}
