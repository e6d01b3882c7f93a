//! OpenAI-compatible analysis backend implementation.
//!
//! Serves both the hosted OpenAI API and any OpenAI-compatible endpoint
//! (vLLM, LocalAI, LM Studio, Ollama's compatibility mode). The only
//! differences are the base URL, credentials, and model name, all carried
//! by [`OpenAiConfig`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use scriba_core::{
    AnalysisBackend, AnalysisRequest, AnalysisResult, Error, OpenAiConfig, PromptConfig, Result,
    TokenUsage,
};

use crate::prompt::{build_instructions, fit_to_budget, ContextBudget};
use crate::sanitize::extract_suggestion;

/// OpenAI-compatible analysis backend.
pub struct OpenAiBackend {
    client: Client,
    config: OpenAiConfig,
    prompt: PromptConfig,
    provider_name: String,
}

impl OpenAiBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: OpenAiConfig, prompt: PromptConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Provider(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing OpenAI-compatible backend: url={}, model={}",
            config.base_url, config.model
        );

        Ok(Self {
            client,
            config,
            prompt,
            provider_name: "openai".to_string(),
        })
    }

    /// Override the provider name reported in logs and metrics (the same
    /// backend serves the `custom` provider).
    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = name.into();
        self
    }

    async fn chat(&self, system: &str, user: &str) -> Result<(String, Option<ChatUsage>)> {
        let start = Instant::now();

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.config.temperature,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let mut builder = self.client.post(&url).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "{} returned {}: {}",
                url, status, body
            )));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse response: {}", e)))?;

        let content = result
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Provider("Invalid API response structure".to_string()))?;

        debug!(
            response_len = content.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Chat completion received"
        );
        Ok((content, result.usage))
    }
}

#[async_trait]
impl AnalysisBackend for OpenAiBackend {
    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    #[instrument(skip(self, request), fields(subsystem = "inference", component = "openai", op = "analyze", document_id = request.document_id, provider = %self.provider_name))]
    async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        let instructions = build_instructions(
            &self.prompt,
            &request.existing_tags,
            &request.existing_correspondents,
        );

        let budget = ContextBudget {
            max_context_tokens: self.config.max_context_tokens,
            response_reserve_tokens: self.config.response_reserve_tokens,
        };
        let (content, truncated) = fit_to_budget(&request.content, budget.available_for(&instructions));

        match self.chat(&instructions, &content).await {
            Ok((text, usage)) => {
                let usage = usage
                    .map(|u| TokenUsage {
                        prompt_tokens: u.prompt_tokens,
                        completion_tokens: u.completion_tokens,
                        total_tokens: u.total_tokens,
                    })
                    .unwrap_or_default();
                debug!(total_tokens = usage.total_tokens, "Token usage reported");
                AnalysisResult {
                    suggestion: extract_suggestion(&text),
                    usage,
                    truncated,
                    error: None,
                }
            }
            Err(e) => AnalysisResult::failure(e.to_string()),
        }
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Request body for the chat completions endpoint.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: String,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

/// A single chat message.
#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Response from the chat completions endpoint.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Token usage for a chat completion request.
#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: i64,
    completion_tokens: i64,
    total_tokens: i64,
}
