//! Ollama analysis backend implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use scriba_core::{
    AnalysisBackend, AnalysisRequest, AnalysisResult, Error, OllamaConfig, PromptConfig, Result,
    TokenUsage,
};

use crate::prompt::{build_instructions, dynamic_context_size, estimate_tokens, fit_to_budget};
use crate::sanitize::extract_suggestion;

/// Ollama analysis backend.
///
/// Talks to a local Ollama instance via `/api/generate`. Ollama does not
/// report token accounting, so usage metrics are always zeroed. The context
/// window (`num_ctx`) is sized per request from the estimated prompt length
/// plus the expected response allowance, capped at the configured maximum.
pub struct OllamaBackend {
    client: Client,
    config: OllamaConfig,
    prompt: PromptConfig,
}

impl OllamaBackend {
    /// Create a new Ollama backend.
    pub fn new(config: OllamaConfig, prompt: PromptConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Provider(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing Ollama backend: url={}, model={}",
            config.base_url, config.model
        );

        Ok(Self {
            client,
            config,
            prompt,
        })
    }

    async fn generate(&self, system: &str, prompt: &str, num_ctx: usize) -> Result<String> {
        let start = Instant::now();

        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt,
            system,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                repeat_penalty: self.config.repeat_penalty,
                top_k: self.config.top_k,
                num_predict: self.config.num_predict,
                num_ctx,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.config.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse response: {}", e)))?;

        let content = result
            .response
            .ok_or_else(|| Error::Provider("Invalid response from Ollama API".to_string()))?;

        debug!(
            response_len = content.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generation complete"
        );
        Ok(content)
    }
}

#[async_trait]
impl AnalysisBackend for OllamaBackend {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(subsystem = "inference", component = "ollama", op = "analyze", document_id = request.document_id))]
    async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        let instructions = build_instructions(
            &self.prompt,
            &request.existing_tags,
            &request.existing_correspondents,
        );

        let available = self
            .config
            .max_ctx
            .saturating_sub(self.config.expected_response_tokens)
            .saturating_sub(estimate_tokens(&instructions));
        let (content, truncated) = fit_to_budget(&request.content, available);

        let prompt_tokens = estimate_tokens(&instructions) + estimate_tokens(&content);
        let num_ctx = dynamic_context_size(
            prompt_tokens,
            self.config.expected_response_tokens,
            self.config.max_ctx,
        );
        debug!(
            prompt_len = content.len(),
            num_ctx, truncated, "Sending generation request"
        );

        match self.generate(&instructions, &content, num_ctx).await {
            Ok(text) => {
                let suggestion = extract_suggestion(&text);
                if suggestion.tags.is_empty() && suggestion.correspondent.is_none() {
                    warn!(
                        document_id = request.document_id,
                        "No tags or correspondent recovered from model response"
                    );
                }
                AnalysisResult {
                    suggestion,
                    // Ollama does not report token accounting.
                    usage: TokenUsage::default(),
                    truncated,
                    error: None,
                }
            }
            Err(e) => AnalysisResult::failure(e.to_string()),
        }
    }
}

/// Request payload for the Ollama `/api/generate` endpoint.
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: String,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

/// Sampling options forwarded to Ollama.
#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
    top_k: u32,
    num_predict: u32,
    num_ctx: usize,
}

/// Response from the Ollama `/api/generate` endpoint.
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}
