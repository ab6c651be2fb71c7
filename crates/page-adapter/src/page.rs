//! CDP-backed implementation of [`PagePort`].
//!
//! Element handles are indices into a page-side registry
//! (`window.__formpilot_els`) populated during scans. Navigation resets the
//! window object, so handles from before a navigation surface as
//! stale-handle errors instead of acting on the wrong element.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::errors::{PageError, PageErrorKind};
use crate::transport::{CdpTransport, CommandTarget};
use crate::{ElementHandle, PagePort};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct CdpPage {
    transport: Arc<dyn CdpTransport>,
    nav_deadline: Duration,
}

impl CdpPage {
    pub fn new(transport: Arc<dyn CdpTransport>, nav_deadline: Duration) -> Self {
        Self {
            transport,
            nav_deadline,
        }
    }

    fn js_literal(text: &str) -> Result<String, PageError> {
        serde_json::to_string(text).map_err(|err| {
            PageError::new(PageErrorKind::Internal)
                .with_hint(format!("invalid js literal encoding: {err}"))
        })
    }

    /// Evaluate an expression and unwrap the by-value result.
    async fn eval_raw(&self, expression: &str) -> Result<Value, PageError> {
        let response = self
            .transport
            .send_command(
                CommandTarget::Page,
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                }),
            )
            .await?;

        if let Some(details) = response.get("exceptionDetails") {
            let text = details
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or("script exception");
            return Err(PageError::new(PageErrorKind::Internal)
                .with_hint(format!("evaluate failed: {text}")));
        }

        Ok(response
            .get("result")
            .and_then(|result| result.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Run an element-scoped snippet. The snippet sees `el` bound to the
    /// registry entry and must return a `{status, value?}` object.
    async fn element_op(&self, element: ElementHandle, body: &str) -> Result<Value, PageError> {
        let expression = format!(
            "(() => {{\n    const reg = window.__formpilot_els;\n    if (!reg) {{ return {{ status: 'stale' }}; }}\n    const el = reg[{id}];\n    if (!el || !el.isConnected) {{ return {{ status: 'stale' }}; }}\n{body}\n}})()",
            id = element.0,
            body = body,
        );

        let value = self.eval_raw(&expression).await?;
        match value.get("status").and_then(Value::as_str).unwrap_or("unknown") {
            "ok" => Ok(value.get("value").cloned().unwrap_or(Value::Null)),
            "stale" => Err(PageError::new(PageErrorKind::StaleHandle)
                .with_hint(format!("handle {element} no longer resolves"))),
            "missing" => Err(PageError::new(PageErrorKind::TargetNotFound)
                .with_hint(format!("element for {element} not found"))),
            other => Err(PageError::new(PageErrorKind::Internal)
                .with_hint(format!("unexpected element op status: {other}"))),
        }
    }

    async fn wait_dom_ready(&self) -> Result<(), PageError> {
        let deadline = Instant::now() + self.nav_deadline;
        loop {
            let state = self.eval_raw("document.readyState").await?;
            match state.as_str() {
                Some("interactive") | Some("complete") => return Ok(()),
                _ => {}
            }
            if Instant::now() >= deadline {
                return Err(PageError::new(PageErrorKind::NavTimeout)
                    .with_hint("document never reached readyState interactive"));
            }
            sleep(READY_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl PagePort for CdpPage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        debug!(url, "navigating page");
        self.transport
            .send_command(CommandTarget::Page, "Page.navigate", json!({ "url": url }))
            .await?;
        self.wait_dom_ready().await
    }

    async fn current_url(&self) -> Result<String, PageError> {
        let value = self.eval_raw("window.location.href").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, PageError> {
        let selector_literal = Self::js_literal(selector)?;
        let expression = format!(
            "(() => {{\n    const reg = window.__formpilot_els = window.__formpilot_els || [];\n    const handles = [];\n    for (const el of document.querySelectorAll({selector})) {{\n        let idx = reg.indexOf(el);\n        if (idx === -1) {{ idx = reg.push(el) - 1; }}\n        handles.push(idx);\n    }}\n    return handles;\n}})()",
            selector = selector_literal,
        );

        let value = self.eval_raw(&expression).await?;
        let ids = value.as_array().ok_or_else(|| {
            PageError::new(PageErrorKind::Internal).with_hint("query_all returned non-array")
        })?;
        Ok(ids
            .iter()
            .filter_map(Value::as_u64)
            .map(ElementHandle)
            .collect())
    }

    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        let name_literal = Self::js_literal(name)?;
        let body = format!(
            "    return {{ status: 'ok', value: el.getAttribute({name_literal}) }};"
        );
        let value = self.element_op(element, &body).await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn inner_text(&self, element: ElementHandle) -> Result<String, PageError> {
        let value = self
            .element_op(
                element,
                "    return { status: 'ok', value: el.innerText || '' };",
            )
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn label_text_for(&self, control_id: &str) -> Result<Option<String>, PageError> {
        let id_literal = Self::js_literal(control_id)?;
        let expression = format!(
            "(() => {{\n    const target = {id_literal};\n    const label = Array.from(document.querySelectorAll('label')).find(l => l.getAttribute('for') === target);\n    return label ? (label.innerText || '') : null;\n}})()",
        );
        let value = self.eval_raw(&expression).await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn ancestor_label_text(
        &self,
        element: ElementHandle,
    ) -> Result<Option<String>, PageError> {
        let value = self
            .element_op(
                element,
                "    const label = el.closest('label');\n    return { status: 'ok', value: label ? (label.innerText || '') : null };",
            )
            .await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn enclosing_legend_text(
        &self,
        element: ElementHandle,
    ) -> Result<Option<String>, PageError> {
        let value = self
            .element_op(
                element,
                "    const fieldset = el.closest('fieldset');\n    const legend = fieldset ? fieldset.querySelector('legend') : null;\n    return { status: 'ok', value: legend ? (legend.innerText || '') : null };",
            )
            .await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn option_labels(&self, element: ElementHandle) -> Result<Vec<String>, PageError> {
        let value = self
            .element_op(
                element,
                "    const labels = Array.from(el.options || []).map(opt => opt.text || '');\n    return { status: 'ok', value: labels };",
            )
            .await?;
        Ok(value
            .as_array()
            .map(|labels| {
                labels
                    .iter()
                    .map(|label| label.as_str().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn clear_value(&self, element: ElementHandle) -> Result<(), PageError> {
        self.element_op(
            element,
            "    el.value = '';\n    el.dispatchEvent(new Event('input', { bubbles: true }));\n    return { status: 'ok' };",
        )
        .await?;
        Ok(())
    }

    async fn type_text(
        &self,
        element: ElementHandle,
        text: &str,
        char_delay: Duration,
    ) -> Result<(), PageError> {
        self.element_op(
            element,
            "    if (typeof el.focus === 'function') { el.focus(); }\n    return { status: 'ok' };",
        )
        .await?;

        for ch in text.chars() {
            let ch_literal = Self::js_literal(&ch.to_string())?;
            let body = format!(
                "    el.value = (el.value || '') + {ch_literal};\n    el.dispatchEvent(new Event('input', {{ bubbles: true }}));\n    return {{ status: 'ok' }};"
            );
            self.element_op(element, &body).await?;
            if !char_delay.is_zero() {
                sleep(char_delay).await;
            }
        }

        self.element_op(
            element,
            "    el.dispatchEvent(new Event('change', { bubbles: true }));\n    return { status: 'ok' };",
        )
        .await?;
        Ok(())
    }

    async fn set_value(&self, element: ElementHandle, value: &str) -> Result<(), PageError> {
        let value_literal = Self::js_literal(value)?;
        let body = format!(
            "    el.value = {value_literal};\n    el.dispatchEvent(new Event('input', {{ bubbles: true }}));\n    el.dispatchEvent(new Event('change', {{ bubbles: true }}));\n    return {{ status: 'ok' }};"
        );
        self.element_op(element, &body).await?;
        Ok(())
    }

    async fn value(&self, element: ElementHandle) -> Result<String, PageError> {
        let value = self
            .element_op(
                element,
                "    return { status: 'ok', value: typeof el.value === 'string' ? el.value : '' };",
            )
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn select_by_label(
        &self,
        element: ElementHandle,
        label: &str,
    ) -> Result<bool, PageError> {
        let label_literal = Self::js_literal(label)?;
        let body = format!(
            "    const target = {label_literal};\n    const options = Array.from(el.options || []);\n    const opt = options.find(o => (o.text || '').trim() === target.trim());\n    if (!opt) {{ return {{ status: 'ok', value: false }}; }}\n    el.value = opt.value;\n    el.dispatchEvent(new Event('input', {{ bubbles: true }}));\n    el.dispatchEvent(new Event('change', {{ bubbles: true }}));\n    return {{ status: 'ok', value: true }};"
        );
        let value = self.element_op(element, &body).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn select_by_value(
        &self,
        element: ElementHandle,
        value: &str,
    ) -> Result<bool, PageError> {
        let value_literal = Self::js_literal(value)?;
        let body = format!(
            "    const target = {value_literal};\n    const options = Array.from(el.options || []);\n    const opt = options.find(o => (o.value || '') === target);\n    if (!opt) {{ return {{ status: 'ok', value: false }}; }}\n    el.value = opt.value;\n    el.dispatchEvent(new Event('input', {{ bubbles: true }}));\n    el.dispatchEvent(new Event('change', {{ bubbles: true }}));\n    return {{ status: 'ok', value: true }};"
        );
        let result = self.element_op(element, &body).await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn selected_label(&self, element: ElementHandle) -> Result<Option<String>, PageError> {
        let value = self
            .element_op(
                element,
                "    const opt = el.selectedIndex >= 0 ? el.options[el.selectedIndex] : null;\n    return { status: 'ok', value: opt ? (opt.text || '').trim() : null };",
            )
            .await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn set_checked(&self, element: ElementHandle, checked: bool) -> Result<(), PageError> {
        let body = format!(
            "    const want = {checked};\n    if (el.checked !== want) {{\n        el.checked = want;\n        el.dispatchEvent(new Event('change', {{ bubbles: true }}));\n    }}\n    return {{ status: 'ok' }};"
        );
        self.element_op(element, &body).await?;
        Ok(())
    }

    async fn is_checked(&self, element: ElementHandle) -> Result<bool, PageError> {
        let value = self
            .element_op(element, "    return { status: 'ok', value: !!el.checked };")
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&self, element: ElementHandle) -> Result<(), PageError> {
        self.element_op(element, "    el.click();\n    return { status: 'ok' };")
            .await?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<(), PageError> {
        self.element_op(
            element,
            "    el.scrollIntoView({ block: 'center', behavior: 'smooth' });\n    return { status: 'ok' };",
        )
        .await?;
        Ok(())
    }

    async fn highlight(&self, element: ElementHandle) -> Result<(), PageError> {
        self.element_op(
            element,
            "    el.style.border = '3px solid red';\n    setTimeout(() => { el.style.border = ''; }, 1000);\n    return { status: 'ok' };",
        )
        .await?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, PageError> {
        self.eval_raw(script).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Records every dispatched command and serves scripted results.
    struct RecordingTransport {
        commands: Mutex<Vec<(String, Value)>>,
        results: Mutex<Vec<Value>>,
    }

    impl RecordingTransport {
        fn new(results: Vec<Value>) -> Self {
            Self {
                commands: Mutex::new(Vec::new()),
                results: Mutex::new(results),
            }
        }

        fn dispatched(&self) -> Vec<(String, Value)> {
            self.commands.lock().clone()
        }
    }

    #[async_trait]
    impl CdpTransport for RecordingTransport {
        async fn start(&self) -> Result<(), PageError> {
            Ok(())
        }

        async fn send_command(
            &self,
            _target: CommandTarget,
            method: &str,
            params: Value,
        ) -> Result<Value, PageError> {
            self.commands.lock().push((method.to_string(), params));
            let mut results = self.results.lock();
            if results.is_empty() {
                Ok(json!({ "result": { "value": null } }))
            } else {
                Ok(results.remove(0))
            }
        }
    }

    fn eval_result(value: Value) -> Value {
        json!({ "result": { "value": value } })
    }

    #[tokio::test]
    async fn query_all_mints_handles() {
        let transport = Arc::new(RecordingTransport::new(vec![eval_result(json!([0, 1, 4]))]));
        let page = CdpPage::new(transport.clone(), Duration::from_secs(1));

        let handles = page.query_all("input").await.unwrap();
        assert_eq!(
            handles,
            vec![ElementHandle(0), ElementHandle(1), ElementHandle(4)]
        );

        let dispatched = transport.dispatched();
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].0, "Runtime.evaluate");
        let expression = dispatched[0].1["expression"].as_str().unwrap();
        assert!(expression.contains("querySelectorAll(\"input\")"));
        assert!(expression.contains("__formpilot_els"));
    }

    #[tokio::test]
    async fn stale_registry_maps_to_stale_handle() {
        let transport = Arc::new(RecordingTransport::new(vec![eval_result(
            json!({ "status": "stale" }),
        )]));
        let page = CdpPage::new(transport, Duration::from_secs(1));

        let err = page.inner_text(ElementHandle(7)).await.unwrap_err();
        assert!(err.is_stale());
    }

    #[tokio::test]
    async fn select_by_label_reports_missing_option_as_false() {
        let transport = Arc::new(RecordingTransport::new(vec![eval_result(
            json!({ "status": "ok", "value": false }),
        )]));
        let page = CdpPage::new(transport, Duration::from_secs(1));

        let selected = page
            .select_by_label(ElementHandle(2), "Prefer not to say")
            .await
            .unwrap();
        assert!(!selected);
    }

    #[tokio::test]
    async fn type_text_paces_one_evaluate_per_char() {
        let results = vec![
            eval_result(json!({ "status": "ok" })), // focus
            eval_result(json!({ "status": "ok" })), // 'h'
            eval_result(json!({ "status": "ok" })), // 'i'
            eval_result(json!({ "status": "ok" })), // change event
        ];
        let transport = Arc::new(RecordingTransport::new(results));
        let page = CdpPage::new(transport.clone(), Duration::from_secs(1));

        page.type_text(ElementHandle(0), "hi", Duration::ZERO)
            .await
            .unwrap();

        let dispatched = transport.dispatched();
        assert_eq!(dispatched.len(), 4);
        assert!(dispatched[1].1["expression"]
            .as_str()
            .unwrap()
            .contains("\"h\""));
        assert!(dispatched[3].1["expression"]
            .as_str()
            .unwrap()
            .contains("change"));
    }

    #[tokio::test]
    async fn evaluate_exception_surfaces_as_internal() {
        let transport = Arc::new(RecordingTransport::new(vec![json!({
            "result": { "value": null },
            "exceptionDetails": { "text": "ReferenceError" },
        })]));
        let page = CdpPage::new(transport, Duration::from_secs(1));

        let err = page.evaluate("nope()").await.unwrap_err();
        assert!(matches!(err.kind, PageErrorKind::Internal));
        assert!(err.hint.unwrap().contains("ReferenceError"));
    }
}
