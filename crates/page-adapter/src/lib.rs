//! Browser automation surface for the form-filling pipeline.
//!
//! [`PagePort`] is the capability set the detector and filler program
//! against: query controls, read attributes and labels, write values, and
//! evaluate scripts. [`CdpPage`] realizes it over a chromium DevTools
//! connection; [`FakePage`] realizes it over an in-memory DOM for tests and
//! offline runs. Handles minted by one scan stay valid until the page
//! navigates; afterwards operations fail with a stale-handle error.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

pub mod config;
pub mod errors;
pub mod fake;
pub mod page;
pub mod transport;
mod util;

pub use config::{default_chrome_path, CdpConfig};
pub use errors::{PageError, PageErrorKind};
pub use fake::{FakeElement, FakePage};
pub use formpilot_core_types::ElementHandle;
pub use page::CdpPage;
pub use transport::{CdpTransport, ChromiumTransport, CommandTarget, NoopTransport};

#[async_trait]
pub trait PagePort: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    async fn current_url(&self) -> Result<String, PageError>;

    /// All elements matching a CSS selector, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, PageError>;

    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, PageError>;

    async fn inner_text(&self, element: ElementHandle) -> Result<String, PageError>;

    /// Text of a `<label for="...">` associated with the given control id.
    async fn label_text_for(&self, control_id: &str) -> Result<Option<String>, PageError>;

    /// Text of a `<label>` ancestor wrapping the control, if any.
    async fn ancestor_label_text(
        &self,
        element: ElementHandle,
    ) -> Result<Option<String>, PageError>;

    /// Text of the `<legend>` of an enclosing `<fieldset>`, if any.
    async fn enclosing_legend_text(
        &self,
        element: ElementHandle,
    ) -> Result<Option<String>, PageError>;

    /// Visible text of every `<option>` under a select, in order.
    async fn option_labels(&self, element: ElementHandle) -> Result<Vec<String>, PageError>;

    async fn clear_value(&self, element: ElementHandle) -> Result<(), PageError>;

    /// Type text one character at a time with the given pacing.
    async fn type_text(
        &self,
        element: ElementHandle,
        text: &str,
        char_delay: Duration,
    ) -> Result<(), PageError>;

    /// Set the control value directly (native date inputs and the like).
    async fn set_value(&self, element: ElementHandle, value: &str) -> Result<(), PageError>;

    async fn value(&self, element: ElementHandle) -> Result<String, PageError>;

    /// Select the option whose visible text equals `label`; false when no
    /// option matches.
    async fn select_by_label(
        &self,
        element: ElementHandle,
        label: &str,
    ) -> Result<bool, PageError>;

    /// Select the option whose value attribute equals `value`; false when
    /// no option matches.
    async fn select_by_value(
        &self,
        element: ElementHandle,
        value: &str,
    ) -> Result<bool, PageError>;

    /// Visible text of the currently selected option.
    async fn selected_label(&self, element: ElementHandle) -> Result<Option<String>, PageError>;

    async fn set_checked(&self, element: ElementHandle, checked: bool) -> Result<(), PageError>;

    async fn is_checked(&self, element: ElementHandle) -> Result<bool, PageError>;

    async fn click(&self, element: ElementHandle) -> Result<(), PageError>;

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<(), PageError>;

    /// Cosmetic border flash for debugging; failures are the caller's to
    /// ignore.
    async fn highlight(&self, element: ElementHandle) -> Result<(), PageError>;

    /// Escape hatch: evaluate an arbitrary expression on the page.
    async fn evaluate(&self, script: &str) -> Result<Value, PageError>;
}
