//! Error types for retrieval.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum RetrievalError {
    /// Transport failure talking to the index service.
    #[error("index request failed: {0}")]
    Transport(String),

    /// Index service answered with a non-success status.
    #[error("index service returned {status}: {detail}")]
    Service { status: u16, detail: String },

    /// Response arrived but could not be decoded.
    #[error("index response invalid: {0}")]
    InvalidResponse(String),
}
