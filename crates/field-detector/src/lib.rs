//! Form-field detection and classification.
//!
//! One synchronous snapshot of the page per call: controls are enumerated
//! in five passes (inputs, textareas, selects, radios, checkboxes), each in
//! document order, classified, and returned as [`FormField`]s. A failure
//! extracting one element skips that element only; it never aborts the
//! scan.

use std::collections::HashSet;
use std::sync::Arc;

use formpilot_core_types::{ElementHandle, FieldType, FormField};
use page_adapter::{PageError, PagePort};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod classify;
pub mod label;

pub use classify::classify_input;
pub use label::{extract_direct_label, extract_label, humanize_name, radio_member_label};

const INPUT_SELECTOR: &str =
    "input:not([type=\"hidden\"]):not([type=\"submit\"]):not([type=\"button\"])";
const RADIO_SELECTOR: &str = "input[type=\"radio\"]";
const CHECKBOX_SELECTOR: &str = "input[type=\"checkbox\"]";

/// Option texts treated as placeholder entries rather than real choices.
const PLACEHOLDER_OPTIONS: &[&str] = &["select", "choose", "please select", "--"];

#[derive(Debug, Error)]
pub enum DetectError {
    /// The page itself could not be scanned (dead transport, navigation).
    #[error("page scan failed: {0}")]
    Page(#[from] PageError),
}

pub struct FormFieldDetector {
    page: Arc<dyn PagePort>,
}

impl FormFieldDetector {
    pub fn new(page: Arc<dyn PagePort>) -> Self {
        Self { page }
    }

    /// Detect every fillable field on the current page state.
    ///
    /// Pass order (inputs, textareas, selects, radios, checkboxes) is part
    /// of the contract; fixtures depend on it.
    pub async fn detect_all_fields(&self) -> Result<Vec<FormField>, DetectError> {
        let mut fields = Vec::new();

        fields.extend(self.detect_inputs().await?);
        fields.extend(self.detect_textareas().await?);
        fields.extend(self.detect_selects().await?);
        fields.extend(self.detect_radios().await?);
        fields.extend(self.detect_checkboxes().await?);

        info!(count = fields.len(), "detected form fields");
        Ok(fields)
    }

    async fn detect_inputs(&self) -> Result<Vec<FormField>, DetectError> {
        let mut fields = Vec::new();
        for element in self.page.query_all(INPUT_SELECTOR).await? {
            match self.extract_input(element).await {
                Ok(Some(field)) => fields.push(field),
                Ok(None) => {}
                Err(err) => warn!(%element, %err, "error detecting input field"),
            }
        }
        Ok(fields)
    }

    async fn extract_input(
        &self,
        element: ElementHandle,
    ) -> Result<Option<FormField>, PageError> {
        let input_type = self
            .page
            .attribute(element, "type")
            .await?
            .unwrap_or_else(|| "text".to_string());

        // radios and checkboxes get their own pass; file uploads are not
        // answerable questions
        if matches!(input_type.as_str(), "radio" | "checkbox" | "file") {
            return Ok(None);
        }

        let name_attr = self.page.attribute(element, "name").await?.unwrap_or_default();
        let id_attr = self.page.attribute(element, "id").await?.unwrap_or_default();
        let placeholder = self
            .page
            .attribute(element, "placeholder")
            .await?
            .unwrap_or_default();

        let field_type = classify_input(&input_type, &name_attr, &id_attr, &placeholder);
        let label = extract_label(self.page.as_ref(), element, true).await?;
        let name = if name_attr.is_empty() { id_attr } else { name_attr };
        let required = self.page.attribute(element, "required").await?.is_some();

        // nothing to ask about
        if label.is_empty() && name.is_empty() && placeholder.is_empty() {
            debug!(%element, "dropping input with no identifying info");
            return Ok(None);
        }

        Ok(Some(
            FormField::new(element, field_type, label, name)
                .with_placeholder(placeholder)
                .with_required(required),
        ))
    }

    async fn detect_textareas(&self) -> Result<Vec<FormField>, DetectError> {
        let mut fields = Vec::new();
        for element in self.page.query_all("textarea").await? {
            match self.extract_textarea(element).await {
                Ok(field) => fields.push(field),
                Err(err) => warn!(%element, %err, "error detecting textarea"),
            }
        }
        Ok(fields)
    }

    async fn extract_textarea(&self, element: ElementHandle) -> Result<FormField, PageError> {
        let label = extract_label(self.page.as_ref(), element, true).await?;
        let name = self.attr_or_id(element).await?;
        let placeholder = self
            .page
            .attribute(element, "placeholder")
            .await?
            .unwrap_or_default();
        let required = self.page.attribute(element, "required").await?.is_some();

        Ok(FormField::new(element, FieldType::Textarea, label, name)
            .with_placeholder(placeholder)
            .with_required(required))
    }

    async fn detect_selects(&self) -> Result<Vec<FormField>, DetectError> {
        let mut fields = Vec::new();
        for element in self.page.query_all("select").await? {
            match self.extract_select(element).await {
                Ok(field) => fields.push(field),
                Err(err) => warn!(%element, %err, "error detecting select"),
            }
        }
        Ok(fields)
    }

    async fn extract_select(&self, element: ElementHandle) -> Result<FormField, PageError> {
        let label = extract_label(self.page.as_ref(), element, true).await?;
        let name = self.attr_or_id(element).await?;
        let required = self.page.attribute(element, "required").await?.is_some();

        let options = self
            .page
            .option_labels(element)
            .await?
            .into_iter()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty() && !is_placeholder_option(text))
            .collect::<Vec<_>>();

        Ok(FormField::new(element, FieldType::Select, label, name)
            .with_required(required)
            .with_options(options))
    }

    async fn detect_radios(&self) -> Result<Vec<FormField>, DetectError> {
        let mut fields = Vec::new();
        let mut processed: HashSet<String> = HashSet::new();

        for element in self.page.query_all(RADIO_SELECTOR).await? {
            match self.extract_radio_group(element, &mut processed).await {
                Ok(Some(field)) => fields.push(field),
                Ok(None) => {}
                Err(err) => warn!(%element, %err, "error detecting radio group"),
            }
        }
        Ok(fields)
    }

    async fn extract_radio_group(
        &self,
        element: ElementHandle,
        processed: &mut HashSet<String>,
    ) -> Result<Option<FormField>, PageError> {
        let Some(name) = self.page.attribute(element, "name").await? else {
            return Ok(None);
        };
        if name.is_empty() || processed.contains(&name) {
            return Ok(None);
        }
        processed.insert(name.clone());

        let selector = format!("input[type=\"radio\"][name=\"{name}\"]");
        let members = self.page.query_all(&selector).await?;

        let mut options = Vec::new();
        for member in &members {
            let option_label = radio_member_label(self.page.as_ref(), *member).await?;
            if !option_label.is_empty() {
                options.push(option_label);
            }
        }

        // the group question: direct label first, then the fieldset legend
        let mut label = extract_direct_label(self.page.as_ref(), element, false).await?;
        if label.is_empty() {
            if let Some(legend) = self.page.enclosing_legend_text(element).await? {
                label = legend.trim().to_string();
            }
        }
        if label.is_empty() {
            label = name.clone();
        }

        Ok(Some(
            FormField::new(element, FieldType::Radio, label, name).with_options(options),
        ))
    }

    async fn detect_checkboxes(&self) -> Result<Vec<FormField>, DetectError> {
        let mut fields = Vec::new();
        for element in self.page.query_all(CHECKBOX_SELECTOR).await? {
            match self.extract_checkbox(element).await {
                Ok(field) => fields.push(field),
                Err(err) => warn!(%element, %err, "error detecting checkbox"),
            }
        }
        Ok(fields)
    }

    async fn extract_checkbox(&self, element: ElementHandle) -> Result<FormField, PageError> {
        let label = extract_label(self.page.as_ref(), element, true).await?;
        let name = self.attr_or_id(element).await?;
        let required = self.page.attribute(element, "required").await?.is_some();

        Ok(FormField::new(element, FieldType::Checkbox, label, name).with_required(required))
    }

    async fn attr_or_id(&self, element: ElementHandle) -> Result<String, PageError> {
        if let Some(name) = self.page.attribute(element, "name").await? {
            if !name.is_empty() {
                return Ok(name);
            }
        }
        Ok(self
            .page
            .attribute(element, "id")
            .await?
            .unwrap_or_default())
    }
}

fn is_placeholder_option(text: &str) -> bool {
    let lowered = text.to_lowercase();
    PLACEHOLDER_OPTIONS.iter().any(|ph| lowered == *ph)
}
