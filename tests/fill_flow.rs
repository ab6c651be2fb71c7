//! End-to-end fill-session flows over the in-memory page and index.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use context_retrieval::{IndexHit, IndexPort, RetrievalError};
use formpilot_core_types::{FillMode, FormField};
use history_tracker::AnswerHistoryTracker;
use llm_gateway::{LlmError, MockCompletion};
use page_adapter::{FakeElement, FakePage, PagePort};
use serde_json::json;
use tempfile::tempdir;

use formpilot_cli::config::Settings;
use formpilot_cli::context::AppContext;
use formpilot_cli::session::{FillSession, PromptAction, Prompter};

/// Index double: fixed document hits, upsert counter.
struct MemoryIndex {
    documents: Vec<IndexHit>,
    upserts: AtomicUsize,
}

impl MemoryIndex {
    fn with_documents(texts: &[&str]) -> Self {
        Self {
            documents: texts
                .iter()
                .map(|text| IndexHit {
                    text: text.to_string(),
                    metadata: serde_json::Value::Null,
                    similarity: 0.8,
                })
                .collect(),
            upserts: AtomicUsize::new(0),
        }
    }

    fn empty() -> Self {
        Self::with_documents(&[])
    }

    fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexPort for MemoryIndex {
    async fn search_documents(
        &self,
        _query: &str,
        top_k: usize,
        _min_similarity: f64,
    ) -> Result<Vec<IndexHit>, RetrievalError> {
        Ok(self.documents.iter().take(top_k).cloned().collect())
    }

    async fn search_history(
        &self,
        _query: &str,
        _top_k: usize,
    ) -> Result<Vec<IndexHit>, RetrievalError> {
        Ok(Vec::new())
    }

    async fn add_history(
        &self,
        _question: &str,
        _answer: &str,
        _metadata: serde_json::Value,
    ) -> Result<(), RetrievalError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedPrompter {
    actions: VecDeque<PromptAction>,
}

impl ScriptedPrompter {
    fn new(actions: Vec<PromptAction>) -> Self {
        Self {
            actions: actions.into(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn choose(&mut self, _field: &FormField, _answer: &str, _confidence: f64) -> PromptAction {
        self.actions.pop_front().unwrap_or(PromptAction::Fill)
    }
}

fn application_page() -> Arc<FakePage> {
    let page = Arc::new(FakePage::new());
    page.add(
        FakeElement::input("email")
            .attr("name", "email")
            .attr("id", "email"),
    );
    page.set_label_for("email", "Email address");
    page.add(
        FakeElement::new("select")
            .attr("name", "workAuth")
            .options(&[("Please Select", ""), ("Yes", "y"), ("No", "n")]),
    );
    page
}

fn test_settings(history_path: &std::path::Path) -> Settings {
    let mut settings = Settings::default();
    settings.browser.slow_mo_ms = 0;
    settings.auto_fill.use_history = false;
    settings.history_file = history_path.to_path_buf();
    settings
}

fn session(
    page: Arc<FakePage>,
    index: Arc<MemoryIndex>,
    llm: Arc<MockCompletion>,
    mode: FillMode,
    settings: &Settings,
) -> FillSession {
    let ctx = AppContext::with_index(settings.clone(), index.clone());
    let generator = ctx.generator_with(llm);
    let tracker = ctx.tracker().expect("tracker opens");
    let page: Arc<dyn PagePort> = page;
    FillSession::new(page, generator, tracker, index, mode, ctx.tempo())
}

#[tokio::test]
async fn batch_mode_fills_detected_fields() {
    let dir = tempdir().unwrap();
    let history_path = dir.path().join("history.json");
    let settings = test_settings(&history_path);

    let page = application_page();
    let index = Arc::new(MemoryIndex::with_documents(&[
        "Contact: jane@example.com",
        "Authorized to work in the US without sponsorship.",
    ]));
    let llm = Arc::new(MockCompletion::with_responses(vec![
        Ok("jane@example.com".to_string()),
        Ok("  yes  ".to_string()),
    ]));

    let mut session = session(page.clone(), index.clone(), llm.clone(), FillMode::Batch, &settings);
    let report = session
        .run(&mut ScriptedPrompter::new(Vec::new()))
        .await
        .unwrap();

    assert_eq!(report.detected, 2);
    assert_eq!(report.filled, 2);
    assert_eq!(report.failed, 0);

    // the email input got typed into, the select landed on canonical "Yes"
    let inputs = page
        .query_all("input:not([type=\"hidden\"]):not([type=\"submit\"]):not([type=\"button\"])")
        .await
        .unwrap();
    assert_eq!(page.value(inputs[0]).await.unwrap(), "jane@example.com");
    let selects = page.query_all("select").await.unwrap();
    assert_eq!(
        page.selected_label(selects[0]).await.unwrap().as_deref(),
        Some("Yes")
    );

    // both outcomes recorded in the file log and the history index
    let tracker = AnswerHistoryTracker::open(&history_path).unwrap();
    assert_eq!(tracker.len(), 2);
    assert_eq!(index.upserts(), 2);
    assert_eq!(llm.calls(), 2);
}

#[tokio::test]
async fn suggest_only_never_mutates_the_page() {
    let dir = tempdir().unwrap();
    let history_path = dir.path().join("history.json");
    let settings = test_settings(&history_path);

    let page = application_page();
    let index = Arc::new(MemoryIndex::with_documents(&["Contact: jane@example.com"]));
    let llm = Arc::new(MockCompletion::always("jane@example.com"));

    let mut session = session(
        page.clone(),
        index.clone(),
        llm,
        FillMode::SuggestOnly,
        &settings,
    );
    let report = session
        .run(&mut ScriptedPrompter::new(vec![
            PromptAction::Fill,
            PromptAction::Fill,
        ]))
        .await
        .unwrap();

    assert_eq!(report.detected, 2);
    assert_eq!(report.filled, 0);
    assert!(page.mutations().is_empty());

    // suggestions are still recorded for future few-shot use
    let tracker = AnswerHistoryTracker::open(&history_path).unwrap();
    assert_eq!(tracker.len(), 2);
    assert_eq!(index.upserts(), 2);
}

#[tokio::test]
async fn empty_context_skips_fields_without_llm_calls() {
    let dir = tempdir().unwrap();
    let history_path = dir.path().join("history.json");
    let settings = test_settings(&history_path);

    let page = application_page();
    let index = Arc::new(MemoryIndex::empty());
    let llm = Arc::new(MockCompletion::always("never used"));

    let mut session = session(page, index.clone(), llm.clone(), FillMode::Batch, &settings);
    let report = session
        .run(&mut ScriptedPrompter::new(Vec::new()))
        .await
        .unwrap();

    assert_eq!(report.detected, 2);
    assert_eq!(report.filled, 0);
    assert_eq!(report.skipped, 2);
    assert_eq!(llm.calls(), 0);
    assert_eq!(index.upserts(), 0);

    let tracker = AnswerHistoryTracker::open(&history_path).unwrap();
    assert!(tracker.is_empty());
}

#[tokio::test]
async fn interactive_edit_overrides_and_marks_history() {
    let dir = tempdir().unwrap();
    let history_path = dir.path().join("history.json");
    let settings = test_settings(&history_path);

    let page = application_page();
    let index = Arc::new(MemoryIndex::with_documents(&["Contact: jane@example.com"]));
    let llm = Arc::new(MockCompletion::always("generated@wrong.com"));

    let mut session = session(
        page.clone(),
        index,
        llm,
        FillMode::Interactive,
        &settings,
    );
    let report = session
        .run(&mut ScriptedPrompter::new(vec![
            PromptAction::Edit("jane@example.com".to_string()),
            PromptAction::Quit,
        ]))
        .await
        .unwrap();

    assert_eq!(report.filled, 1);

    let inputs = page
        .query_all("input:not([type=\"hidden\"]):not([type=\"submit\"]):not([type=\"button\"])")
        .await
        .unwrap();
    assert_eq!(page.value(inputs[0]).await.unwrap(), "jane@example.com");

    let tracker = AnswerHistoryTracker::open(&history_path).unwrap();
    assert_eq!(tracker.len(), 1);
    let entry = &tracker.recent_entries(1)[0];
    assert!(entry.was_edited);
    assert_eq!(entry.answer, "jane@example.com");
}

#[tokio::test]
async fn generation_failure_skips_field_but_continues() {
    let dir = tempdir().unwrap();
    let history_path = dir.path().join("history.json");
    let settings = test_settings(&history_path);

    let page = application_page();
    let index = Arc::new(MemoryIndex::with_documents(&["some context"]));
    // first field fails terminally, second succeeds
    let llm = Arc::new(MockCompletion::with_responses(vec![
        Err(LlmError::Http("boom".to_string())),
        Ok("yes".to_string()),
    ]));

    let mut session = session(page, index, llm, FillMode::Batch, &settings);
    let report = session
        .run(&mut ScriptedPrompter::new(Vec::new()))
        .await
        .unwrap();

    assert_eq!(report.detected, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.filled, 1);
}
