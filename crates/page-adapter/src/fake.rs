//! In-memory [`PagePort`] implementation.
//!
//! Backs tests and offline development with a small DOM model: elements with
//! attributes, labels, options and checked state, plus a mutation log so
//! tests can assert that suggest-only flows never write to the page. The
//! selector support covers the tag/attribute/:not shapes the detector and
//! filler actually use.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::errors::{PageError, PageErrorKind};
use crate::{ElementHandle, PagePort};

#[derive(Clone, Debug, Default)]
pub struct FakeOption {
    pub label: String,
    pub value: String,
}

#[derive(Clone, Debug)]
pub struct FakeElement {
    pub tag: String,
    pub attrs: HashMap<String, String>,
    pub inner_text: String,
    pub options: Vec<FakeOption>,
    pub checked: bool,
    pub value: String,
    /// Text of a wrapping `<label>`, if the control sits inside one.
    pub wrapped_label: Option<String>,
    /// Text of the `<legend>` of an enclosing `<fieldset>`, if any.
    pub legend: Option<String>,
    valid: bool,
}

impl FakeElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: HashMap::new(),
            inner_text: String::new(),
            options: Vec::new(),
            checked: false,
            value: String::new(),
            wrapped_label: None,
            legend: None,
            valid: true,
        }
    }

    pub fn input(input_type: &str) -> Self {
        Self::new("input").attr("type", input_type)
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.inner_text = text.into();
        self
    }

    pub fn options(mut self, pairs: &[(&str, &str)]) -> Self {
        self.options = pairs
            .iter()
            .map(|(label, value)| FakeOption {
                label: (*label).to_string(),
                value: (*value).to_string(),
            })
            .collect();
        self
    }

    pub fn wrapped_label(mut self, text: impl Into<String>) -> Self {
        self.wrapped_label = Some(text.into());
        self
    }

    pub fn legend(mut self, text: impl Into<String>) -> Self {
        self.legend = Some(text.into());
        self
    }
}

#[derive(Default)]
struct FakeState {
    elements: Vec<FakeElement>,
    labels_for: HashMap<String, String>,
    mutations: Vec<String>,
    url: String,
}

#[derive(Default)]
pub struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element to the page, returning its handle.
    pub fn add(&self, element: FakeElement) -> ElementHandle {
        let mut state = self.state.lock();
        state.elements.push(element);
        ElementHandle((state.elements.len() - 1) as u64)
    }

    /// Register a `<label for="...">` association.
    pub fn set_label_for(&self, control_id: impl Into<String>, text: impl Into<String>) {
        self.state
            .lock()
            .labels_for
            .insert(control_id.into(), text.into());
    }

    /// Every page-mutating operation performed so far.
    pub fn mutations(&self) -> Vec<String> {
        self.state.lock().mutations.clone()
    }

    /// Invalidate all outstanding handles, as a navigation would.
    pub fn invalidate_handles(&self) {
        for element in self.state.lock().elements.iter_mut() {
            element.valid = false;
        }
    }

    fn with_element<T>(
        &self,
        handle: ElementHandle,
        op: impl FnOnce(&mut FakeState, usize) -> T,
    ) -> Result<T, PageError> {
        let mut state = self.state.lock();
        let index = handle.0 as usize;
        match state.elements.get(index) {
            None => Err(PageError::new(PageErrorKind::TargetNotFound)
                .with_hint(format!("no element for {handle}"))),
            Some(element) if !element.valid => Err(PageError::new(PageErrorKind::StaleHandle)
                .with_hint(format!("{handle} invalidated by navigation"))),
            Some(_) => Ok(op(&mut state, index)),
        }
    }

    fn log(state: &mut FakeState, entry: String) {
        state.mutations.push(entry);
    }
}

/// One parsed CSS selector step: tag plus attribute filters.
struct SelectorSpec {
    tag: String,
    required: Vec<(String, String)>,
    rejected: Vec<(String, String)>,
}

impl SelectorSpec {
    fn parse(selector: &str) -> Result<Self, PageError> {
        let selector = selector.trim();
        let tag_end = selector
            .find(|c| c == '[' || c == ':')
            .unwrap_or(selector.len());
        let tag = selector[..tag_end].to_string();
        if tag.is_empty() {
            return Err(PageError::new(PageErrorKind::Internal)
                .with_hint(format!("unsupported selector '{selector}'")));
        }

        let mut required = Vec::new();
        let mut rejected = Vec::new();
        let mut rest = &selector[tag_end..];

        while !rest.is_empty() {
            if let Some(stripped) = rest.strip_prefix(":not(") {
                let close = stripped.find(')').ok_or_else(|| {
                    PageError::new(PageErrorKind::Internal)
                        .with_hint(format!("unbalanced :not in '{selector}'"))
                })?;
                rejected.push(Self::parse_attr(&stripped[..close])?);
                rest = &stripped[close + 1..];
            } else if rest.starts_with('[') {
                let close = rest.find(']').ok_or_else(|| {
                    PageError::new(PageErrorKind::Internal)
                        .with_hint(format!("unbalanced attribute in '{selector}'"))
                })?;
                required.push(Self::parse_attr(&rest[..close + 1])?);
                rest = &rest[close + 1..];
            } else {
                return Err(PageError::new(PageErrorKind::Internal)
                    .with_hint(format!("unsupported selector '{selector}'")));
            }
        }

        Ok(Self {
            tag,
            required,
            rejected,
        })
    }

    fn parse_attr(clause: &str) -> Result<(String, String), PageError> {
        let inner = clause.trim_start_matches('[').trim_end_matches(']');
        let (name, value) = inner.split_once('=').ok_or_else(|| {
            PageError::new(PageErrorKind::Internal)
                .with_hint(format!("unsupported attribute clause '{clause}'"))
        })?;
        Ok((
            name.trim().to_string(),
            value.trim().trim_matches('"').trim_matches('\'').to_string(),
        ))
    }

    fn matches(&self, element: &FakeElement) -> bool {
        if element.tag != self.tag {
            return false;
        }
        for (name, value) in &self.required {
            if element.attrs.get(name) != Some(value) {
                return false;
            }
        }
        for (name, value) in &self.rejected {
            if element.attrs.get(name) == Some(value) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl PagePort for FakePage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        let mut state = self.state.lock();
        state.url = url.to_string();
        for element in state.elements.iter_mut() {
            element.valid = false;
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self.state.lock().url.clone())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, PageError> {
        let spec = SelectorSpec::parse(selector)?;
        let state = self.state.lock();
        Ok(state
            .elements
            .iter()
            .enumerate()
            .filter(|(_, element)| element.valid && spec.matches(element))
            .map(|(index, _)| ElementHandle(index as u64))
            .collect())
    }

    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        self.with_element(element, |state, index| {
            state.elements[index].attrs.get(name).cloned()
        })
    }

    async fn inner_text(&self, element: ElementHandle) -> Result<String, PageError> {
        self.with_element(element, |state, index| {
            state.elements[index].inner_text.clone()
        })
    }

    async fn label_text_for(&self, control_id: &str) -> Result<Option<String>, PageError> {
        Ok(self.state.lock().labels_for.get(control_id).cloned())
    }

    async fn ancestor_label_text(
        &self,
        element: ElementHandle,
    ) -> Result<Option<String>, PageError> {
        self.with_element(element, |state, index| {
            state.elements[index].wrapped_label.clone()
        })
    }

    async fn enclosing_legend_text(
        &self,
        element: ElementHandle,
    ) -> Result<Option<String>, PageError> {
        self.with_element(element, |state, index| state.elements[index].legend.clone())
    }

    async fn option_labels(&self, element: ElementHandle) -> Result<Vec<String>, PageError> {
        self.with_element(element, |state, index| {
            state.elements[index]
                .options
                .iter()
                .map(|option| option.label.clone())
                .collect()
        })
    }

    async fn clear_value(&self, element: ElementHandle) -> Result<(), PageError> {
        self.with_element(element, |state, index| {
            state.elements[index].value.clear();
            Self::log(state, format!("clear {element}"));
        })
    }

    async fn type_text(
        &self,
        element: ElementHandle,
        text: &str,
        _char_delay: Duration,
    ) -> Result<(), PageError> {
        self.with_element(element, |state, index| {
            state.elements[index].value.push_str(text);
            Self::log(state, format!("type {element} '{text}'"));
        })
    }

    async fn set_value(&self, element: ElementHandle, value: &str) -> Result<(), PageError> {
        self.with_element(element, |state, index| {
            state.elements[index].value = value.to_string();
            Self::log(state, format!("set_value {element} '{value}'"));
        })
    }

    async fn value(&self, element: ElementHandle) -> Result<String, PageError> {
        self.with_element(element, |state, index| state.elements[index].value.clone())
    }

    async fn select_by_label(
        &self,
        element: ElementHandle,
        label: &str,
    ) -> Result<bool, PageError> {
        self.with_element(element, |state, index| {
            let found = state.elements[index]
                .options
                .iter()
                .find(|option| option.label.trim() == label.trim())
                .map(|option| option.value.clone());
            match found {
                Some(value) => {
                    state.elements[index].value = value;
                    Self::log(state, format!("select {element} label '{label}'"));
                    true
                }
                None => false,
            }
        })
    }

    async fn select_by_value(
        &self,
        element: ElementHandle,
        value: &str,
    ) -> Result<bool, PageError> {
        self.with_element(element, |state, index| {
            let found = state.elements[index]
                .options
                .iter()
                .any(|option| option.value == value);
            if found {
                state.elements[index].value = value.to_string();
                Self::log(state, format!("select {element} value '{value}'"));
            }
            found
        })
    }

    async fn selected_label(&self, element: ElementHandle) -> Result<Option<String>, PageError> {
        self.with_element(element, |state, index| {
            let current = state.elements[index].value.clone();
            state.elements[index]
                .options
                .iter()
                .find(|option| option.value == current)
                .map(|option| option.label.trim().to_string())
        })
    }

    async fn set_checked(&self, element: ElementHandle, checked: bool) -> Result<(), PageError> {
        self.with_element(element, |state, index| {
            if state.elements[index].checked != checked {
                state.elements[index].checked = checked;
                Self::log(state, format!("set_checked {element} {checked}"));
            }
            // checking a radio unchecks the rest of its group
            if checked
                && state.elements[index].attrs.get("type").map(String::as_str) == Some("radio")
            {
                if let Some(group) = state.elements[index].attrs.get("name").cloned() {
                    for (other_index, other) in state.elements.iter_mut().enumerate() {
                        if other_index != index
                            && other.attrs.get("type").map(String::as_str) == Some("radio")
                            && other.attrs.get("name") == Some(&group)
                        {
                            other.checked = false;
                        }
                    }
                }
            }
        })
    }

    async fn is_checked(&self, element: ElementHandle) -> Result<bool, PageError> {
        self.with_element(element, |state, index| state.elements[index].checked)
    }

    async fn click(&self, element: ElementHandle) -> Result<(), PageError> {
        self.with_element(element, |state, _index| {
            Self::log(state, format!("click {element}"));
        })
    }

    async fn scroll_into_view(&self, _element: ElementHandle) -> Result<(), PageError> {
        Ok(())
    }

    async fn highlight(&self, _element: ElementHandle) -> Result<(), PageError> {
        Ok(())
    }

    async fn evaluate(&self, _script: &str) -> Result<Value, PageError> {
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn selector_filters_match_detector_shapes() {
        let page = FakePage::new();
        page.add(FakeElement::input("text").attr("name", "firstName"));
        page.add(FakeElement::input("hidden").attr("name", "csrf"));
        page.add(FakeElement::input("radio").attr("name", "visa"));
        page.add(FakeElement::new("textarea").attr("name", "summary"));

        let inputs = page
            .query_all("input:not([type=\"hidden\"]):not([type=\"submit\"]):not([type=\"button\"])")
            .await
            .unwrap();
        assert_eq!(inputs.len(), 2);

        let radios = page
            .query_all("input[type=\"radio\"][name=\"visa\"]")
            .await
            .unwrap();
        assert_eq!(radios.len(), 1);

        let textareas = page.query_all("textarea").await.unwrap();
        assert_eq!(textareas.len(), 1);
    }

    #[tokio::test]
    async fn navigation_invalidates_handles() {
        let page = FakePage::new();
        let el = page.add(FakeElement::input("text").attr("name", "email"));
        assert!(page.value(el).await.is_ok());

        page.navigate("https://example.com/next").await.unwrap();
        let err = page.value(el).await.unwrap_err();
        assert!(err.is_stale());
    }

    #[tokio::test]
    async fn radio_check_unchecks_group() {
        let page = FakePage::new();
        let yes = page.add(FakeElement::input("radio").attr("name", "visa").attr("value", "yes"));
        let no = page.add(FakeElement::input("radio").attr("name", "visa").attr("value", "no"));

        page.set_checked(yes, true).await.unwrap();
        page.set_checked(no, true).await.unwrap();
        assert!(!page.is_checked(yes).await.unwrap());
        assert!(page.is_checked(no).await.unwrap());
    }

    #[tokio::test]
    async fn mutation_log_records_writes_only() {
        let page = FakePage::new();
        let el = page.add(FakeElement::new("select").options(&[("Yes", "y")]));

        page.option_labels(el).await.unwrap();
        page.scroll_into_view(el).await.unwrap();
        assert!(page.mutations().is_empty());

        page.select_by_label(el, "Yes").await.unwrap();
        assert_eq!(page.mutations().len(), 1);
    }
}
