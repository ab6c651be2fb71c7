//! HTTP client for the vector-index sidecar service.
//!
//! The service owns embeddings and storage; this client only speaks its
//! search/upsert JSON contract over the two collections.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::RetrievalError;
use crate::ports::{IndexHit, IndexPort};

const DOCUMENTS_COLLECTION: &str = "documents";
const HISTORY_COLLECTION: &str = "answer_history";

#[derive(Clone, Debug)]
pub struct IndexConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8900".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

pub struct RestIndexClient {
    client: Client,
    config: IndexConfig,
}

impl RestIndexClient {
    pub fn new(config: IndexConfig) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| RetrievalError::Transport(format!("failed to build client: {err}")))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    async fn search(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
        min_similarity: f64,
    ) -> Result<Vec<IndexHit>, RetrievalError> {
        let body = SearchRequest {
            collection: collection.to_string(),
            query: query.to_string(),
            top_k,
            min_similarity,
        };

        debug!(collection, top_k, "searching index");
        let response = self
            .client
            .post(self.url("search"))
            .json(&body)
            .send()
            .await
            .map_err(|err| RetrievalError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(RetrievalError::Service { status, detail });
        }

        let payload: SearchResponse = response
            .json()
            .await
            .map_err(|err| RetrievalError::InvalidResponse(err.to_string()))?;
        Ok(payload.results)
    }
}

#[async_trait]
impl IndexPort for RestIndexClient {
    async fn search_documents(
        &self,
        query: &str,
        top_k: usize,
        min_similarity: f64,
    ) -> Result<Vec<IndexHit>, RetrievalError> {
        self.search(DOCUMENTS_COLLECTION, query, top_k, min_similarity)
            .await
    }

    async fn search_history(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<IndexHit>, RetrievalError> {
        self.search(HISTORY_COLLECTION, query, top_k, 0.0).await
    }

    async fn add_history(
        &self,
        question: &str,
        answer: &str,
        metadata: Value,
    ) -> Result<(), RetrievalError> {
        let body = UpsertRequest {
            collection: HISTORY_COLLECTION.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
            metadata,
        };

        let response = self
            .client
            .post(self.url("upsert"))
            .json(&body)
            .send()
            .await
            .map_err(|err| RetrievalError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(RetrievalError::Service { status, detail });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest {
    collection: String,
    query: String,
    top_k: usize,
    min_similarity: f64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<IndexHit>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest {
    collection: String,
    question: String,
    answer: String,
    metadata: Value,
}
