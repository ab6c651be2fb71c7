//! Shared data model for the form-filling pipeline.
//!
//! These types are the contract between the detector, the answer engine and
//! the filler; they carry no behavior beyond construction and formatting.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identifier for one fill session, used to correlate log lines and history.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to a live DOM control.
///
/// Handles are minted by the page adapter during a scan and stay valid until
/// the page navigates; a stale handle surfaces as a distinct page error, not
/// a panic.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub u64);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el#{}", self.0)
    }
}

/// Closed set of semantic control types.
///
/// The variant drives prompt template choice, fill strategy and answer
/// post-processing; every component matches exhaustively so a new variant
/// fails to compile until handled everywhere.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Date,
    Number,
    Email,
    Phone,
    File,
    Unknown,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::Number => "number",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::File => "file",
            FieldType::Unknown => "unknown",
        }
    }

    /// Whether answers for this type must land inside a closed option set.
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fillable control, or one whole radio group.
///
/// For radio groups the handle points at the first member and `options`
/// lists every member's resolved label. `value` is a scratch slot written
/// after a successful fill; it carries nothing beforehand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormField {
    pub element: ElementHandle,
    pub field_type: FieldType,
    pub label: String,
    pub name: String,
    pub placeholder: String,
    pub required: bool,
    pub options: Vec<String>,
    pub value: String,
}

impl FormField {
    pub fn new(
        element: ElementHandle,
        field_type: FieldType,
        label: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            element,
            field_type,
            label: label.into(),
            name: name.into(),
            placeholder: String::new(),
            required: false,
            options: Vec::new(),
            value: String::new(),
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FormField(type={}, label='{}', required={})",
            self.field_type, self.label, self.required
        )
    }
}

/// A past question/answer pair surfaced by the history index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimilarQuestion {
    pub question: String,
    pub answer: String,
    pub similarity: f64,
}

/// Transient result of one retrieval round.
///
/// `context` is relevance-ranked with no dedup guarantee; `confidence` is
/// derived from the snippet count alone.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub context: Vec<String>,
    pub similar_questions: Vec<SimilarQuestion>,
    pub confidence: f64,
}

/// The outcome of one answer-generation request.
///
/// Created fresh per field and consumed immediately; `context_used` is
/// always populated, including on error paths, for observability.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub confidence: f64,
    pub context_used: Vec<String>,
    #[serde(default)]
    pub similar_questions: Vec<SimilarQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GeneratedAnswer {
    /// The empty-context short-circuit result: no LLM call was made.
    pub fn no_context() -> Self {
        Self {
            answer: String::new(),
            confidence: 0.0,
            context_used: Vec::new(),
            similar_questions: Vec::new(),
            error: Some("No relevant context found".to_string()),
        }
    }

    /// A generation failure that still reports the context it retrieved.
    pub fn failed(error: impl Into<String>, context_used: Vec<String>) -> Self {
        Self {
            answer: String::new(),
            confidence: 0.0,
            context_used,
            similar_questions: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One persisted answer-history record (append-only log, index-addressable).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: String,
    pub field_type: FieldType,
    pub confidence: f64,
    pub was_edited: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl HistoryEntry {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        field_type: FieldType,
        confidence: f64,
        was_edited: bool,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            field_type,
            confidence,
            was_edited,
            timestamp: Utc::now(),
            last_modified: None,
            metadata: serde_json::Value::Null,
        }
    }
}

/// How the orchestrator applies generated answers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillMode {
    /// Prompt per field: fill, edit, skip or quit.
    Interactive,
    /// Fill every field without prompting.
    Batch,
    /// Generate answers but never mutate the page.
    SuggestOnly,
}

impl FillMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillMode::Interactive => "interactive",
            FillMode::Batch => "batch",
            FillMode::SuggestOnly => "suggest-only",
        }
    }

    /// Whether this mode ever writes to the page.
    pub fn mutates_page(&self) -> bool {
        !matches!(self, FillMode::SuggestOnly)
    }
}

impl fmt::Display for FillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown fill mode '{0}', expected interactive|batch|suggest-only")]
pub struct ParseFillModeError(String);

impl FromStr for FillMode {
    type Err = ParseFillModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interactive" => Ok(FillMode::Interactive),
            "batch" => Ok(FillMode::Batch),
            "suggest-only" | "suggest_only" | "suggest" => Ok(FillMode::SuggestOnly),
            other => Err(ParseFillModeError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_round_trips_through_serde() {
        let json = serde_json::to_string(&FieldType::Textarea).unwrap();
        assert_eq!(json, "\"textarea\"");
        let back: FieldType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FieldType::Textarea);
    }

    #[test]
    fn choice_types() {
        assert!(FieldType::Select.is_choice());
        assert!(FieldType::Radio.is_choice());
        assert!(!FieldType::Checkbox.is_choice());
        assert!(!FieldType::Text.is_choice());
    }

    #[test]
    fn fill_mode_parses() {
        assert_eq!("batch".parse::<FillMode>().unwrap(), FillMode::Batch);
        assert_eq!(
            "suggest-only".parse::<FillMode>().unwrap(),
            FillMode::SuggestOnly
        );
        assert!("autopilot".parse::<FillMode>().is_err());
        assert!(!FillMode::SuggestOnly.mutates_page());
    }

    #[test]
    fn no_context_answer_is_tagged() {
        let answer = GeneratedAnswer::no_context();
        assert!(answer.answer.is_empty());
        assert_eq!(answer.confidence, 0.0);
        assert!(answer.is_error());
    }
}
