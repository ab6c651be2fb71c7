//! Port to the external vector-index service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::RetrievalError;

/// One ranked hit from a similarity search.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexHit {
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub similarity: f64,
}

/// Nearest-neighbor service over the two collections the pipeline uses:
/// ingested documents and the answer history.
///
/// The storage engine behind this port is a black box; only ranked search
/// and history upsert are consumed.
#[async_trait]
pub trait IndexPort: Send + Sync {
    /// Top-k document snippets for a query, filtered by a minimum
    /// similarity, ranked most-similar first.
    async fn search_documents(
        &self,
        query: &str,
        top_k: usize,
        min_similarity: f64,
    ) -> Result<Vec<IndexHit>, RetrievalError>;

    /// Top-k past question/answer pairs, no similarity floor. The hit text
    /// is the stored question; the answer rides in `metadata.answer`.
    async fn search_history(&self, query: &str, top_k: usize)
        -> Result<Vec<IndexHit>, RetrievalError>;

    /// Append a question/answer pair to the history collection.
    async fn add_history(
        &self,
        question: &str,
        answer: &str,
        metadata: serde_json::Value,
    ) -> Result<(), RetrievalError>;
}
