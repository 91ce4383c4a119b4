//! Workers AI chat client
//!
//! Stateless request/response LLM access behind the `LlmClient` trait.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::AssistantError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_MODEL: &str = "@cf/meta/llama-3.3-70b-instruct-fp8-fast";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Trait for chat completion (model controlled)
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run a chat completion and return the raw response text.
    async fn run(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> crate::Result<String>;
}

/// Reusable Workers AI client (connection-pooled)
pub struct WorkersAiClient {
    client: reqwest::Client,
    api_token: String,
    url: String,
}

impl WorkersAiClient {
    pub fn new(account_id: &str, api_token: String, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_token,
            url: format!(
                "https://api.cloudflare.com/client/v4/accounts/{}/ai/run/{}",
                account_id, model
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct AiRunRequest<'a> {
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct AiRunResponse {
    success: bool,
    result: Option<AiRunResult>,
    #[serde(default)]
    errors: Vec<AiRunError>,
}

#[derive(Debug, Deserialize)]
struct AiRunResult {
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AiRunError {
    message: String,
}

#[async_trait]
impl LlmClient for WorkersAiClient {
    async fn run(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> crate::Result<String> {
        if self.api_token.is_empty() {
            return Err(AssistantError::LlmError(
                "CF_API_TOKEN not configured".to_string(),
            ));
        }

        let request = AiRunRequest {
            messages,
            max_tokens,
            temperature,
        };

        info!(max_tokens, "Calling Workers AI");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Workers AI request failed: {}", e);
                AssistantError::LlmError(format!("Workers AI error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Workers AI error response: {}", error_text);
            return Err(AssistantError::LlmError(format!(
                "Workers AI error: {}",
                error_text
            )));
        }

        let body: AiRunResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Workers AI response: {}", e);
            AssistantError::LlmError(format!("Workers AI parse error: {}", e))
        })?;

        if !body.success {
            let detail = body
                .errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(AssistantError::LlmError(format!(
                "Workers AI error: {}",
                detail
            )));
        }

        body.result
            .and_then(|r| r.response)
            .ok_or_else(|| AssistantError::LlmError("Empty response from Workers AI".to_string()))
    }
}

/// Scripted client for development & testing.
/// Keeps the system functional without credentials: once the script runs
/// out it returns non-JSON text, which drives the deterministic fallbacks.
pub struct MockLlm {
    responses: Mutex<VecDeque<String>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self::scripted(Vec::new())
    }

    pub fn scripted(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn run(
        &self,
        _messages: &[ChatMessage],
        _max_tokens: u32,
        _temperature: f32,
    ) -> crate::Result<String> {
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| AssistantError::LlmError("Mock response queue poisoned".to_string()))?;
        Ok(responses
            .pop_front()
            .unwrap_or_else(|| "No scripted response available.".to_string()))
    }
}
