//! Error categories surfaced by the page adapter.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// High-level failure classes for page operations.
#[derive(Clone, Debug, Error, Serialize, Deserialize)]
pub enum PageErrorKind {
    #[error("target element not found")]
    TargetNotFound,
    /// The handle referred to an element that no longer exists, usually
    /// because the page navigated after the scan.
    #[error("element handle is stale")]
    StaleHandle,
    #[error("option not found")]
    OptionNotFound,
    #[error("navigation timed out")]
    NavTimeout,
    #[error("cdp i/o failure")]
    CdpIo,
    #[error("internal error")]
    Internal,
}

/// Enriched error passed back to higher layers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageError {
    pub kind: PageErrorKind,
    pub hint: Option<String>,
    pub retriable: bool,
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for PageError {}

impl PageError {
    pub fn new(kind: PageErrorKind) -> Self {
        Self {
            kind,
            hint: None,
            retriable: false,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn retriable(mut self, flag: bool) -> Self {
        self.retriable = flag;
        self
    }

    pub fn is_stale(&self) -> bool {
        matches!(self.kind, PageErrorKind::StaleHandle)
    }
}
