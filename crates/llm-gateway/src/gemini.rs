//! Google Gemini completion client.
//!
//! Talks to the `generateContent` REST endpoint. Rate limits (HTTP 429 or a
//! quota-tagged error body) retry with exponential backoff; other failures
//! retry on a fixed delay, both bounded by the configured attempt budget.
//! A safety-blocked response yields an empty string rather than an error so
//! the caller can treat it like any other unanswerable question.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::LlmError;
use crate::retry::RetryPolicy;
use crate::CompletionPort;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-1.5-flash".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() || config.api_key == "your_api_key_here" {
            return Err(LlmError::MissingApiKey(
                "set GEMINI_API_KEY in the environment".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| LlmError::Http(format!("failed to build HTTP client: {err}")))?;
        info!(model = %config.model, "initialized Gemini client");
        Ok(Self { client, config })
    }

    async fn request_once(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.api_base.trim_end_matches('/'),
            self.config.model,
            self.config.api_key,
        );

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| LlmError::Http(format!("gemini request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            if status.as_u16() == 429 || text.to_lowercase().contains("quota") {
                return Err(LlmError::RateLimited(format!("gemini returned {status}")));
            }
            return Err(LlmError::Http(format!("gemini returned {status}: {text}")));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| LlmError::InvalidResponse(err.to_string()))?;

        match payload.first_text() {
            Some(text) => Ok(text.trim().to_string()),
            None => {
                if let Some(feedback) = payload.prompt_feedback {
                    warn!(
                        reason = feedback.block_reason.as_deref().unwrap_or("unknown"),
                        "gemini response blocked"
                    );
                    return Ok(String::new());
                }
                Err(LlmError::InvalidResponse(
                    "gemini response missing content".to_string(),
                ))
            }
        }
    }
}

#[async_trait]
impl CompletionPort for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        debug!(prompt_chars = prompt.len(), "sending completion request");
        self.config.retry.run(|| self.request_once(prompt)).await
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text = parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(default, rename = "blockReason")]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_startup_error() {
        let err = GeminiClient::new(GeminiConfig::default()).err().unwrap();
        assert!(matches!(err, LlmError::MissingApiKey(_)));

        let placeholder = GeminiConfig {
            api_key: "your_api_key_here".to_string(),
            ..GeminiConfig::default()
        };
        assert!(GeminiClient::new(placeholder).is_err());
    }

    #[test]
    fn response_text_joins_parts() {
        let payload: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello" }, { "text": "world" }] }
            }]
        }))
        .unwrap();
        assert_eq!(payload.first_text().unwrap(), "Hello\nworld");
    }

    #[test]
    fn blocked_response_has_no_text() {
        let payload: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert!(payload.first_text().is_none());
        assert_eq!(
            payload.prompt_feedback.unwrap().block_reason.as_deref(),
            Some("SAFETY")
        );
    }
}
