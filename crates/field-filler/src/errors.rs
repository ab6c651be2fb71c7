//! Error types for field filling.

use page_adapter::PageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FillError {
    /// Neither exact, fuzzy nor value matching found an option to select.
    #[error("no matching option for '{answer}'")]
    NoMatch { answer: String },

    /// The control handle went stale (page navigated since detection).
    #[error("stale control: {0}")]
    Stale(String),

    /// The control could not be driven.
    #[error("page interaction failed: {0}")]
    Page(String),

    /// Field type the filler cannot act on.
    #[error("unsupported field type: {0}")]
    Unsupported(String),
}

impl From<PageError> for FillError {
    fn from(err: PageError) -> Self {
        if err.is_stale() {
            FillError::Stale(err.to_string())
        } else {
            FillError::Page(err.to_string())
        }
    }
}
