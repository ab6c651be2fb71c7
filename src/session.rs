//! The fill session: detect, generate, apply, record — one field at a
//! time, strictly sequential.
//!
//! Nothing in this loop may abort the batch: generation errors skip the
//! field, fill failures are recorded as such, and only the user's quit
//! action ends the session early.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use answer_engine::{construct_question, AnswerGenerator};
use anyhow::Result;
use context_retrieval::IndexPort;
use field_detector::FormFieldDetector;
use field_filler::{FieldFiller, Tempo};
use formpilot_core_types::{FillMode, FormField, HistoryEntry, SessionId};
use history_tracker::AnswerHistoryTracker;
use page_adapter::PagePort;
use serde_json::json;
use tracing::{info, warn};

/// What the user chose to do with a suggested answer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PromptAction {
    Fill,
    Edit(String),
    Skip,
    Quit,
}

/// Per-field decision source for interactive modes.
pub trait Prompter {
    fn choose(&mut self, field: &FormField, answer: &str, confidence: f64) -> PromptAction;
}

/// Reads F/E/S/Q decisions from stdin.
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn choose(&mut self, _field: &FormField, _answer: &str, _confidence: f64) -> PromptAction {
        println!("\n[F] Fill  [E] Edit  [S] Skip  [Q] Quit");
        print!("Your choice: ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return PromptAction::Skip;
        }

        match line.trim().to_lowercase().as_str() {
            "f" => PromptAction::Fill,
            "e" => {
                print!("Enter your answer: ");
                let _ = io::stdout().flush();
                let mut edited = String::new();
                if io::stdin().lock().read_line(&mut edited).is_err() {
                    return PromptAction::Skip;
                }
                PromptAction::Edit(edited.trim().to_string())
            }
            "s" => PromptAction::Skip,
            "q" => PromptAction::Quit,
            _ => {
                println!("Invalid choice, skipping...");
                PromptAction::Skip
            }
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SessionReport {
    pub detected: usize,
    pub filled: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct FillSession {
    page: Arc<dyn PagePort>,
    generator: AnswerGenerator,
    tracker: AnswerHistoryTracker,
    index: Arc<dyn IndexPort>,
    mode: FillMode,
    tempo: Tempo,
    highlight: bool,
    session_id: SessionId,
}

impl FillSession {
    pub fn new(
        page: Arc<dyn PagePort>,
        generator: AnswerGenerator,
        tracker: AnswerHistoryTracker,
        index: Arc<dyn IndexPort>,
        mode: FillMode,
        tempo: Tempo,
    ) -> Self {
        Self {
            page,
            generator,
            tracker,
            index,
            mode,
            tempo,
            highlight: false,
            session_id: SessionId::new(),
        }
    }

    pub fn with_highlight(mut self, enabled: bool) -> Self {
        self.highlight = enabled;
        self
    }

    /// Process every detected field on the current page.
    pub async fn run(&mut self, prompter: &mut dyn Prompter) -> Result<SessionReport> {
        let detector = FormFieldDetector::new(self.page.clone());
        let filler =
            FieldFiller::new(self.page.clone(), self.tempo).with_highlight(self.highlight);

        let mut fields = detector.detect_all_fields().await?;
        let mut report = SessionReport {
            detected: fields.len(),
            ..SessionReport::default()
        };

        if fields.is_empty() {
            println!("No form fields detected on this page");
            return Ok(report);
        }

        let total = fields.len();
        for (position, field) in fields.iter_mut().enumerate() {
            println!("\n{}", "=".repeat(60));
            println!("Field {}/{}", position + 1, total);
            println!("Type: {}", field.field_type);
            println!("Label: {}", field.label);
            if field.required {
                println!("(Required)");
            }

            filler.scroll_to_field(field).await;

            println!("\nGenerating answer...");
            let generated = match self.generator.answer_for_field(field).await {
                Ok(generated) => generated,
                Err(err) => {
                    warn!(session = %self.session_id, label = %field.label, %err,
                        "generation failed, skipping field");
                    report.skipped += 1;
                    continue;
                }
            };

            if let Some(error) = &generated.error {
                println!("  {error}");
                report.skipped += 1;
                continue;
            }

            let mut answer = generated.answer.clone();
            let mut was_edited = false;

            println!("\nGenerated Answer: {answer}");
            println!("Confidence: {:.1}%", generated.confidence * 100.0);

            if matches!(self.mode, FillMode::Interactive | FillMode::SuggestOnly) {
                match prompter.choose(field, &answer, generated.confidence) {
                    PromptAction::Quit => {
                        println!("Quitting...");
                        break;
                    }
                    PromptAction::Skip => {
                        println!("Skipped");
                        report.skipped += 1;
                        continue;
                    }
                    PromptAction::Edit(edited) => {
                        answer = edited;
                        was_edited = true;
                    }
                    PromptAction::Fill => {}
                }
            }

            if self.mode.mutates_page() {
                if filler.fill_field(field, &answer).await {
                    println!("Filled");
                    report.filled += 1;
                } else {
                    println!("Failed to fill");
                    report.failed += 1;
                }
            }

            self.record(field, &answer, generated.confidence, was_edited)
                .await;
        }

        info!(
            session = %self.session_id,
            filled = report.filled,
            failed = report.failed,
            skipped = report.skipped,
            "fill session complete"
        );
        Ok(report)
    }

    /// Append the question/answer pair to the on-disk history and the
    /// history index. Index failures are logged, never fatal.
    async fn record(&mut self, field: &FormField, answer: &str, confidence: f64, edited: bool) {
        let question = construct_question(field);

        let mut entry = HistoryEntry::new(
            field.label.clone(),
            answer.to_string(),
            field.field_type,
            confidence,
            edited,
        );
        entry.metadata = json!({ "question": question, "session": self.session_id.0 });

        if let Err(err) = self.tracker.add_entry(entry) {
            warn!(%err, "failed to persist history entry");
        }

        let metadata = json!({
            "field_type": field.field_type.as_str(),
            "confidence": confidence,
        });
        if let Err(err) = self
            .index
            .add_history(&field.label, answer, metadata)
            .await
        {
            warn!(%err, "failed to index history entry");
        }
    }
}
