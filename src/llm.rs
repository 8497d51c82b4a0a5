//! Chat-completion client for explanations
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint (OpenRouter in
//! production). Uses a long-lived reqwest::Client for connection pooling.
//!
//! Failures never leave this module: `complete` turns them into a visible
//! placeholder so the orchestrator always has text to show.

use crate::config::AppConfig;
use crate::error::AssistantError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Prefix of the inline text returned when the provider call fails
pub const EXPLANATION_ERROR_PREFIX: &str = "⚠️ Explanation unavailable";

/// Produces explanation text for a prompt pair; never fails
#[async_trait]
pub trait ExplanationRequester: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> String;
}

/// Reusable chat-completion client (connection-pooled)
pub struct ChatCompletionClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl ChatCompletionClient {
    pub fn new(config: &AppConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(config.llm_timeout)
            .build()?;

        if config.llm_api_key.is_none() {
            warn!("OPENROUTER_API_KEY not set; explanations will show a configuration notice");
        }

        Ok(Self {
            client,
            base_url: config.llm_base_url.clone(),
            api_key: config.llm_api_key.clone(),
            model: config.llm_model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Single provider round-trip, errors surfaced
    pub async fn try_complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> crate::Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AssistantError::ConfigError("OPENROUTER_API_KEY not configured".to_string())
        })?;

        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: 0.2,
            max_tokens: 512,
        };

        info!(model = %self.model, "Calling chat-completion API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .header("X-Title", "SDRAG")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Chat-completion request failed: {}", e);
                AssistantError::LlmError(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Chat-completion error response ({}): {}", status, error_text);
            return Err(AssistantError::LlmError(format!(
                "provider returned {}",
                status
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse chat-completion response: {}", e);
            AssistantError::LlmError(format!("parse error: {}", e))
        })?;

        let answer = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AssistantError::LlmError("empty response from provider".to_string()))?;

        if let Some(usage) = chat_response.usage {
            info!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat-completion response received"
            );
        }

        Ok(answer)
    }
}

#[async_trait]
impl ExplanationRequester for ChatCompletionClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> String {
        match self.try_complete(system_prompt, user_prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Explanation call failed: {}", e);
                format!("{}: {}", EXPLANATION_ERROR_PREFIX, e)
            }
        }
    }
}

/// Returns fixed text; for headless runs without a provider
#[derive(Debug, Clone)]
pub struct StaticExplainer {
    text: String,
}

impl StaticExplainer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl ExplanationRequester for StaticExplainer {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> String {
        self.text.clone()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
