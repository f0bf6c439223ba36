//! Language model boundary.
//!
//! [`LanguageModel`] turns a system prompt plus user text into a completion.
//! [`OllamaLlm`] implements it against Ollama's non-streaming
//! `POST {url}/api/generate` endpoint.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::LlmConfig;
use crate::error::RagError;
use crate::http::{build_client, post_json_with_retry};

/// Sampling options forwarded to the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_k: 5,
            top_p: 0.1,
        }
    }
}

impl From<&LlmConfig> for SamplingParams {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    /// The user turn, here the question.
    pub prompt: String,
    pub sampling: SamplingParams,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Return the model's completion text, unmodified.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Ollama text generation (`stream: false`).
pub struct OllamaLlm {
    client: reqwest::Client,
    model: String,
    url: String,
    max_retries: u32,
}

impl OllamaLlm {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            model: config.model.clone(),
            url: config.url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl LanguageModel for OllamaLlm {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "system": request.system,
            "prompt": request.prompt,
            "stream": false,
            "options": request.sampling,
        });

        tracing::debug!(model = %self.model, "sending generation request");
        let json = post_json_with_retry(
            &self.client,
            "Ollama",
            &format!("{}/api/generate", self.url),
            None,
            &body,
            self.max_retries,
        )
        .await?;

        parse_generate_response(&json)
    }
}

fn parse_generate_response(json: &Value) -> Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(str::to_string)
        .ok_or_else(|| RagError::service("Ollama", "response is missing the response field").into())
}
