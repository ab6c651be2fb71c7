//! Context retrieval for answer generation.
//!
//! Turns a natural-language question into ranked context snippets, similar
//! past question/answer pairs, and a coarse confidence score.

use std::sync::Arc;

use formpilot_core_types::{RetrievalResult, SimilarQuestion};
use tracing::debug;

pub mod errors;
pub mod ports;
pub mod rest;

pub use errors::RetrievalError;
pub use ports::{IndexHit, IndexPort};
pub use rest::{IndexConfig, RestIndexClient};

const SIMILAR_QUESTIONS_TOP_K: usize = 3;

pub struct ContextRetriever {
    index: Arc<dyn IndexPort>,
    top_k: usize,
    similarity_threshold: f64,
}

impl ContextRetriever {
    pub fn new(index: Arc<dyn IndexPort>, top_k: usize, similarity_threshold: f64) -> Self {
        Self {
            index,
            top_k,
            similarity_threshold,
        }
    }

    /// Top-k document snippets relevant to the question, texts only, ranked
    /// most-similar first.
    pub async fn retrieve_context(&self, question: &str) -> Result<Vec<String>, RetrievalError> {
        let hits = self
            .index
            .search_documents(question, self.top_k, self.similarity_threshold)
            .await?;
        Ok(hits.into_iter().map(|hit| hit.text).collect())
    }

    /// Top-3 past question/answer pairs from the history index, no
    /// similarity floor.
    pub async fn retrieve_similar_questions(
        &self,
        question: &str,
    ) -> Result<Vec<SimilarQuestion>, RetrievalError> {
        let hits = self
            .index
            .search_history(question, SIMILAR_QUESTIONS_TOP_K)
            .await?;
        Ok(hits
            .into_iter()
            .map(|hit| {
                let answer = hit
                    .metadata
                    .get("answer")
                    .and_then(|value| value.as_str())
                    .unwrap_or_default()
                    .to_string();
                SimilarQuestion {
                    question: hit.text,
                    answer,
                    similarity: hit.similarity,
                }
            })
            .collect())
    }

    /// Retrieve context and similar questions in one round and attach the
    /// confidence score.
    pub async fn retrieve_all(&self, question: &str) -> Result<RetrievalResult, RetrievalError> {
        let context = self.retrieve_context(question).await?;
        let similar_questions = self.retrieve_similar_questions(question).await?;
        let confidence = self.confidence(context.len());
        debug!(
            snippets = context.len(),
            similar = similar_questions.len(),
            confidence,
            "retrieval complete"
        );
        Ok(RetrievalResult {
            context,
            similar_questions,
            confidence,
        })
    }

    /// Count-banded confidence heuristic.
    ///
    /// Known limitation carried over deliberately: the score looks only at
    /// how many snippets cleared the threshold, not at their similarity
    /// values. Downstream consumers depend on these exact bands.
    pub fn confidence(&self, snippet_count: usize) -> f64 {
        if snippet_count == 0 {
            0.0
        } else if snippet_count >= self.top_k {
            0.9
        } else if snippet_count >= 3 {
            0.7
        } else {
            0.5
        }
    }
}
