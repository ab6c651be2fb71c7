//! Application context: every shared component, constructed once at
//! startup and passed into command handlers. No process-wide singletons.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use answer_engine::AnswerGenerator;
use context_retrieval::{ContextRetriever, IndexConfig, IndexPort, RestIndexClient};
use field_filler::Tempo;
use history_tracker::AnswerHistoryTracker;
use llm_gateway::{CompletionPort, GeminiClient, GeminiConfig};
use tracing::info;

use crate::config::{gemini_api_key, Settings};

pub struct AppContext {
    settings: Settings,
    index: Arc<dyn IndexPort>,
}

impl AppContext {
    /// Build the context from loaded settings.
    pub fn new(settings: Settings) -> Result<Self> {
        let index: Arc<dyn IndexPort> = Arc::new(
            RestIndexClient::new(IndexConfig {
                endpoint: settings.index.endpoint.clone(),
                timeout: Duration::from_secs(15),
            })
            .context("failed to build index client")?,
        );

        Ok(Self { settings, index })
    }

    /// Build the context with a caller-supplied index port (tests, offline
    /// runs).
    pub fn with_index(settings: Settings, index: Arc<dyn IndexPort>) -> Self {
        Self { settings, index }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn index(&self) -> Arc<dyn IndexPort> {
        self.index.clone()
    }

    /// The live completion client. Errors when no API key is configured;
    /// commands that need the LLM treat that as fatal at startup.
    pub fn completion(&self) -> Result<Arc<dyn CompletionPort>> {
        let api_key = gemini_api_key()
            .context("GEMINI_API_KEY not set; export it before running LLM commands")?;
        let client = GeminiClient::new(GeminiConfig {
            api_key,
            model: self.settings.gemini.model.clone(),
            api_base: self.settings.gemini.api_base.clone(),
            temperature: self.settings.gemini.temperature,
            max_tokens: self.settings.gemini.max_tokens,
            ..GeminiConfig::default()
        })?;
        info!(model = %self.settings.gemini.model, "completion client ready");
        Ok(Arc::new(client))
    }

    pub fn retriever(&self) -> ContextRetriever {
        ContextRetriever::new(
            self.index.clone(),
            self.settings.index.top_k,
            self.settings.index.similarity_threshold,
        )
    }

    /// Answer generator wired to the live completion client.
    pub fn generator(&self) -> Result<AnswerGenerator> {
        Ok(AnswerGenerator::new(
            self.completion()?,
            self.retriever(),
            self.settings.auto_fill.use_history,
        ))
    }

    /// Answer generator over a caller-supplied completion port.
    pub fn generator_with(&self, completion: Arc<dyn CompletionPort>) -> AnswerGenerator {
        AnswerGenerator::new(
            completion,
            self.retriever(),
            self.settings.auto_fill.use_history,
        )
    }

    pub fn tracker(&self) -> Result<AnswerHistoryTracker> {
        AnswerHistoryTracker::open(&self.settings.history_file)
            .context("failed to open answer history")
    }

    pub fn tempo(&self) -> Tempo {
        Tempo::with_slow_mo(Duration::from_millis(self.settings.browser.slow_mo_ms))
    }
}
