//! Completion gateway: the text-completion port and its implementations.
//!
//! The answer engine depends only on [`CompletionPort`]; the Gemini client is
//! the production implementation and [`MockCompletion`] the deterministic
//! test double.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

pub mod errors;
pub mod gemini;
pub mod retry;

pub use errors::LlmError;
pub use gemini::{GeminiClient, GeminiConfig};
pub use retry::RetryPolicy;

/// Abstraction over a text-completion service so providers can be swapped
/// and tests can run offline.
#[async_trait]
pub trait CompletionPort: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Deterministic completion double for tests and offline development.
///
/// Serves scripted responses in order, repeating the last one when the
/// script runs dry, and counts every call so tests can assert that the
/// service was (or was not) invoked.
#[derive(Default)]
pub struct MockCompletion {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<Result<String, LlmError>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockCompletion {
    /// Always answer with the same text.
    pub fn always(answer: impl Into<String>) -> Self {
        Self {
            fallback: Some(Ok(answer.into())),
            ..Self::default()
        }
    }

    /// Always fail with the same error message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fallback: Some(Err(LlmError::Http(message.into()))),
            ..Self::default()
        }
    }

    /// Serve the given responses in order, then fall back to the last one.
    pub fn with_responses(responses: Vec<Result<String, LlmError>>) -> Self {
        let fallback = responses.last().cloned();
        Self {
            responses: Mutex::new(responses.into()),
            fallback,
            ..Self::default()
        }
    }

    /// Number of `complete` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("mock completion lock poisoned").clone()
    }
}

#[async_trait]
impl CompletionPort for MockCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .expect("mock completion lock poisoned")
            .push(prompt.to_string());
        let scripted = self
            .responses
            .lock()
            .expect("mock completion lock poisoned")
            .pop_front();
        match scripted.or_else(|| self.fallback.clone()) {
            Some(response) => response,
            None => Ok(String::new()),
        }
    }
}
