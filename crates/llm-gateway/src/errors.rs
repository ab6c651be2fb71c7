//! Error types for the completion gateway.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum LlmError {
    /// API key missing or placeholder at construction time.
    #[error("missing API key: {0}")]
    MissingApiKey(String),

    /// Transport or non-2xx HTTP failure.
    #[error("completion request failed: {0}")]
    Http(String),

    /// Provider signalled a rate limit or quota exhaustion.
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    /// Response arrived but could not be decoded.
    #[error("completion response invalid: {0}")]
    InvalidResponse(String),

    /// Retries exhausted without a usable response.
    #[error("failed to generate response after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl LlmError {
    /// Rate-limit class errors retry with exponential backoff; everything
    /// else retries on a fixed delay.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited(_))
    }
}
