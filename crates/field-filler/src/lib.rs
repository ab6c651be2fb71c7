//! Field filling: map a generated answer onto a live control and apply it.
//!
//! One attempt per call, no internal retries; every failure converts to a
//! `false` return plus a logged message at the [`FieldFiller::fill_field`]
//! boundary. Selection types walk exact match, fuzzy match, then the value
//! attribute before giving up.

use std::sync::Arc;
use std::time::Duration;

use field_detector::radio_member_label;
use formpilot_core_types::{FieldType, FormField};
use once_cell::sync::Lazy;
use page_adapter::PagePort;
use regex::Regex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub mod errors;
pub mod matching;
pub mod tempo;

pub use errors::FillError;
pub use matching::{best_match, similarity_ratio, MATCH_THRESHOLD, SUBSTRING_SCORE};
pub use tempo::Tempo;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digit run regex"));

pub struct FieldFiller {
    page: Arc<dyn PagePort>,
    tempo: Tempo,
    debug_highlight: bool,
}

impl FieldFiller {
    pub fn new(page: Arc<dyn PagePort>, tempo: Tempo) -> Self {
        Self {
            page,
            tempo,
            debug_highlight: false,
        }
    }

    pub fn with_highlight(mut self, enabled: bool) -> Self {
        self.debug_highlight = enabled;
        self
    }

    /// Fill one field, reporting success as a boolean.
    ///
    /// On success the applied text (canonical option text for selection
    /// types) lands in `field.value`. Failures never propagate; they log
    /// and return false.
    pub async fn fill_field(&self, field: &mut FormField, value: &str) -> bool {
        match self.try_fill(field, value).await {
            Ok(applied) => {
                field.value = applied;
                true
            }
            Err(err) => {
                warn!(label = %field.label, %err, "error filling field");
                false
            }
        }
    }

    /// Fill one field, reporting the applied text or a classified failure.
    pub async fn try_fill(&self, field: &FormField, value: &str) -> Result<String, FillError> {
        if !self.tempo.slow_mo.is_zero() {
            sleep(self.tempo.slow_mo).await;
        }
        if self.debug_highlight {
            if let Err(err) = self.page.highlight(field.element).await {
                debug!(%err, "highlight failed");
            }
        }

        match field.field_type {
            FieldType::Text | FieldType::Email | FieldType::Phone => {
                self.fill_text(field, value, self.tempo.text_char_delay())
                    .await
            }
            FieldType::Textarea => {
                self.fill_text(field, value, self.tempo.textarea_char_delay())
                    .await
            }
            FieldType::Select => self.fill_select(field, value).await,
            FieldType::Radio => self.fill_radio(field, value).await,
            FieldType::Checkbox => self.fill_checkbox(field, value).await,
            FieldType::Date => {
                // native date controls take the literal string
                self.page.set_value(field.element, value).await?;
                Ok(value.to_string())
            }
            FieldType::Number => self.fill_number(field, value).await,
            FieldType::File | FieldType::Unknown => Err(FillError::Unsupported(
                field.field_type.as_str().to_string(),
            )),
        }
    }

    /// Scroll the control into view and let the page settle.
    pub async fn scroll_to_field(&self, field: &FormField) {
        if let Err(err) = self.page.scroll_into_view(field.element).await {
            debug!(%err, "scroll into view failed");
            return;
        }
        if !self.tempo.scroll_settle.is_zero() {
            sleep(self.tempo.scroll_settle).await;
        }
    }

    async fn fill_text(
        &self,
        field: &FormField,
        value: &str,
        char_delay: Duration,
    ) -> Result<String, FillError> {
        self.page.clear_value(field.element).await?;
        self.page
            .type_text(field.element, value, char_delay)
            .await?;
        Ok(value.to_string())
    }

    async fn fill_select(&self, field: &FormField, value: &str) -> Result<String, FillError> {
        // exact visible-text match first
        if self.page.select_by_label(field.element, value).await? {
            return Ok(value.trim().to_string());
        }

        // fuzzy match against the detected option set
        if let Some(candidate) = best_match(value, &field.options) {
            if self.page.select_by_label(field.element, candidate).await? {
                info!(answer = value, option = candidate, "used fuzzy match");
                return Ok(candidate.to_string());
            }
        }

        // last resort: the underlying value attribute
        if self.page.select_by_value(field.element, value).await? {
            return Ok(value.to_string());
        }

        Err(FillError::NoMatch {
            answer: value.to_string(),
        })
    }

    async fn fill_radio(&self, field: &FormField, value: &str) -> Result<String, FillError> {
        let selector = format!("input[type=\"radio\"][name=\"{}\"]", field.name);
        let members = self.page.query_all(&selector).await?;

        // exact label match
        for member in &members {
            let label = radio_member_label(self.page.as_ref(), *member).await?;
            if !label.is_empty() && label.eq_ignore_ascii_case(value.trim()) {
                self.page.set_checked(*member, true).await?;
                return Ok(label);
            }
        }

        // fuzzy match against the group's option labels
        if let Some(candidate) = best_match(value, &field.options) {
            for member in &members {
                let label = radio_member_label(self.page.as_ref(), *member).await?;
                if label == candidate {
                    self.page.set_checked(*member, true).await?;
                    info!(answer = value, option = candidate, "used fuzzy match");
                    return Ok(label);
                }
            }
        }

        // affirmative answers map onto any member that reads as "yes"
        let lowered = value.trim().to_lowercase();
        if lowered == "yes" || lowered == "true" {
            for member in &members {
                let label = radio_member_label(self.page.as_ref(), *member).await?;
                if label.to_lowercase().contains("yes") {
                    self.page.set_checked(*member, true).await?;
                    return Ok(label);
                }
            }
        }

        Err(FillError::NoMatch {
            answer: value.to_string(),
        })
    }

    async fn fill_checkbox(&self, field: &FormField, value: &str) -> Result<String, FillError> {
        let should_check = matches!(
            value.trim().to_lowercase().as_str(),
            "yes" | "true" | "1" | "checked"
        );
        self.page.set_checked(field.element, should_check).await?;
        Ok(value.trim().to_string())
    }

    async fn fill_number(&self, field: &FormField, value: &str) -> Result<String, FillError> {
        let applied = match DIGIT_RUN.find(value) {
            Some(found) => found.as_str().to_string(),
            None => value.to_string(),
        };
        self.page.set_value(field.element, &applied).await?;
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_adapter::{FakeElement, FakePage};

    fn filler(page: &Arc<FakePage>) -> FieldFiller {
        let port: Arc<dyn PagePort> = page.clone();
        FieldFiller::new(
            port,
            Tempo {
                slow_mo: Duration::ZERO,
                scroll_settle: Duration::ZERO,
            },
        )
    }

    fn select_field(page: &Arc<FakePage>) -> FormField {
        let element = page.add(FakeElement::new("select").attr("name", "workAuth").options(&[
            ("Yes", "y"),
            ("No", "n"),
            ("Prefer not to say", "pnts"),
        ]));
        FormField::new(element, FieldType::Select, "Authorized?", "workAuth").with_options(vec![
            "Yes".to_string(),
            "No".to_string(),
            "Prefer not to say".to_string(),
        ])
    }

    #[tokio::test]
    async fn select_case_insensitive_match_lands_canonical_text() {
        let page = Arc::new(FakePage::new());
        let mut field = select_field(&page);
        let filler = filler(&page);

        assert!(filler.fill_field(&mut field, "yes").await);
        assert_eq!(field.value, "Yes");
        assert_eq!(
            page.selected_label(field.element).await.unwrap().as_deref(),
            Some("Yes")
        );
    }

    #[tokio::test]
    async fn select_exact_match_succeeds() {
        let page = Arc::new(FakePage::new());
        let mut field = select_field(&page);
        let filler = filler(&page);

        assert!(filler.fill_field(&mut field, "Prefer not to say").await);
        assert_eq!(field.value, "Prefer not to say");
    }

    #[tokio::test]
    async fn select_falls_back_to_value_attribute() {
        let page = Arc::new(FakePage::new());
        let element = page.add(
            FakeElement::new("select")
                .attr("name", "plan")
                .options(&[("Option Two", "opt-2")]),
        );
        let mut field = FormField::new(element, FieldType::Select, "Plan", "plan")
            .with_options(vec!["Option Two".to_string()]);
        let filler = filler(&page);

        assert!(filler.fill_field(&mut field, "opt-2").await);
        assert_eq!(page.value(element).await.unwrap(), "opt-2");
    }

    #[tokio::test]
    async fn select_with_no_match_fails_without_mutation() {
        let page = Arc::new(FakePage::new());
        let mut field = select_field(&page);
        let filler = filler(&page);

        assert!(!filler.fill_field(&mut field, "qqqqqqqq").await);
        assert!(page.mutations().is_empty());
        assert!(field.value.is_empty());
    }

    fn radio_group(page: &Arc<FakePage>, labels: &[&str]) -> FormField {
        let mut first = None;
        for label in labels {
            let handle = page.add(
                FakeElement::input("radio")
                    .attr("name", "sponsor")
                    .attr("value", *label),
            );
            first.get_or_insert(handle);
        }
        FormField::new(
            first.expect("at least one radio"),
            FieldType::Radio,
            "Sponsorship?",
            "sponsor",
        )
        .with_options(labels.iter().map(|l| l.to_string()).collect())
    }

    #[tokio::test]
    async fn radio_exact_label_checks_member() {
        let page = Arc::new(FakePage::new());
        let mut field = radio_group(&page, &["Yes", "No"]);
        let filler = filler(&page);

        assert!(filler.fill_field(&mut field, "no").await);
        let members = page
            .query_all("input[type=\"radio\"][name=\"sponsor\"]")
            .await
            .unwrap();
        assert!(!page.is_checked(members[0]).await.unwrap());
        assert!(page.is_checked(members[1]).await.unwrap());
    }

    #[tokio::test]
    async fn radio_true_maps_to_yes_member() {
        let page = Arc::new(FakePage::new());
        let mut field = radio_group(&page, &["Yes, I am authorized", "Not at this time"]);
        let filler = filler(&page);

        assert!(filler.fill_field(&mut field, "true").await);
        let members = page
            .query_all("input[type=\"radio\"][name=\"sponsor\"]")
            .await
            .unwrap();
        assert!(page.is_checked(members[0]).await.unwrap());
        assert_eq!(field.value, "Yes, I am authorized");
    }

    #[tokio::test]
    async fn radio_without_match_fails() {
        let page = Arc::new(FakePage::new());
        let mut field = radio_group(&page, &["Red", "Green"]);
        let filler = filler(&page);

        assert!(!filler.fill_field(&mut field, "purple elephants").await);
    }

    #[tokio::test]
    async fn checkbox_fill_is_idempotent() {
        let page = Arc::new(FakePage::new());
        let element = page.add(FakeElement::input("checkbox").attr("name", "terms"));
        let mut field = FormField::new(element, FieldType::Checkbox, "Terms", "terms");
        let filler = filler(&page);

        assert!(filler.fill_field(&mut field, "Yes").await);
        let first_state = page.is_checked(element).await.unwrap();
        assert!(filler.fill_field(&mut field, "Yes").await);
        assert_eq!(page.is_checked(element).await.unwrap(), first_state);
        assert!(first_state);

        // and unchecking works the same way
        assert!(filler.fill_field(&mut field, "No").await);
        assert!(!page.is_checked(element).await.unwrap());
        assert!(filler.fill_field(&mut field, "No").await);
        assert!(!page.is_checked(element).await.unwrap());
    }

    #[tokio::test]
    async fn text_fill_clears_then_types() {
        let page = Arc::new(FakePage::new());
        let element = page.add(FakeElement::input("text").attr("name", "email"));
        page.set_value(element, "stale@old.com").await.unwrap();
        let mut field = FormField::new(element, FieldType::Email, "Email", "email");
        let filler = filler(&page);

        assert!(filler.fill_field(&mut field, "jane@example.com").await);
        assert_eq!(page.value(element).await.unwrap(), "jane@example.com");
    }

    #[tokio::test]
    async fn number_fill_extracts_first_digit_run() {
        let page = Arc::new(FakePage::new());
        let element = page.add(FakeElement::input("number").attr("name", "years"));
        let mut field = FormField::new(element, FieldType::Number, "Years", "years");
        let filler = filler(&page);

        assert!(filler.fill_field(&mut field, "5 years (since 2019)").await);
        assert_eq!(page.value(element).await.unwrap(), "5");
        assert_eq!(field.value, "5");

        // no digits: the literal passes through
        assert!(filler.fill_field(&mut field, "none").await);
        assert_eq!(page.value(element).await.unwrap(), "none");
    }

    #[tokio::test]
    async fn date_fill_passes_literal() {
        let page = Arc::new(FakePage::new());
        let element = page.add(FakeElement::input("date").attr("name", "start"));
        let mut field = FormField::new(element, FieldType::Date, "Start date", "start");
        let filler = filler(&page);

        assert!(filler.fill_field(&mut field, "05/2020").await);
        assert_eq!(page.value(element).await.unwrap(), "05/2020");
    }

    #[tokio::test]
    async fn stale_handle_is_a_fill_failure() {
        let page = Arc::new(FakePage::new());
        let mut field = select_field(&page);
        let filler = filler(&page);
        page.invalidate_handles();

        assert!(!filler.fill_field(&mut field, "Yes").await);
    }

    #[tokio::test]
    async fn unsupported_types_fail_cleanly() {
        let page = Arc::new(FakePage::new());
        let element = page.add(FakeElement::input("text").attr("name", "x"));
        let mut field = FormField::new(element, FieldType::Unknown, "X", "x");
        let filler = filler(&page);

        assert!(!filler.fill_field(&mut field, "anything").await);
    }
}
