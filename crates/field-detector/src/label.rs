//! Label extraction for detected controls.
//!
//! Precedence, first non-empty wins: associated `<label for>`, wrapping
//! `<label>`, aria-label, placeholder (only when nearby fallback is
//! allowed), then the name attribute rewritten into Title Case words.
//! An empty result is a valid outcome, not an error.

use formpilot_core_types::ElementHandle;
use once_cell::sync::Lazy;
use page_adapter::{PageError, PagePort};
use regex::Regex;

static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z])([A-Z])").expect("camel boundary regex"));
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_-]").expect("separator regex"));

/// The direct-label chain: label association, wrapping label, aria-label,
/// and (when allowed) the placeholder. No name fallback.
pub async fn extract_direct_label(
    page: &dyn PagePort,
    element: ElementHandle,
    include_nearby: bool,
) -> Result<String, PageError> {
    if let Some(id) = page.attribute(element, "id").await? {
        if !id.is_empty() {
            if let Some(text) = page.label_text_for(&id).await? {
                let text = text.trim();
                if !text.is_empty() {
                    return Ok(text.to_string());
                }
            }
        }
    }

    if let Some(text) = page.ancestor_label_text(element).await? {
        let text = text.trim();
        if !text.is_empty() {
            return Ok(text.to_string());
        }
    }

    if let Some(aria) = page.attribute(element, "aria-label").await? {
        let aria = aria.trim();
        if !aria.is_empty() {
            return Ok(aria.to_string());
        }
    }

    if include_nearby {
        if let Some(placeholder) = page.attribute(element, "placeholder").await? {
            let placeholder = placeholder.trim();
            if !placeholder.is_empty() {
                return Ok(placeholder.to_string());
            }
        }
    }

    Ok(String::new())
}

/// Full label chain: the direct chain, then the name attribute humanized
/// into Title Case words.
pub async fn extract_label(
    page: &dyn PagePort,
    element: ElementHandle,
    include_nearby: bool,
) -> Result<String, PageError> {
    let direct = extract_direct_label(page, element, include_nearby).await?;
    if !direct.is_empty() {
        return Ok(direct);
    }

    if let Some(name) = page.attribute(element, "name").await? {
        if !name.trim().is_empty() {
            return Ok(humanize_name(&name));
        }
    }

    Ok(String::new())
}

/// Label for one radio group member: label association, wrapping label,
/// then the value attribute.
///
/// The filler resolves member labels the same way, so option lists built
/// here match what the fill pass will compare against.
pub async fn radio_member_label(
    page: &dyn PagePort,
    element: ElementHandle,
) -> Result<String, PageError> {
    if let Some(id) = page.attribute(element, "id").await? {
        if !id.is_empty() {
            if let Some(text) = page.label_text_for(&id).await? {
                let text = text.trim();
                if !text.is_empty() {
                    return Ok(text.to_string());
                }
            }
        }
    }

    if let Some(text) = page.ancestor_label_text(element).await? {
        let text = text.trim();
        if !text.is_empty() {
            return Ok(text.to_string());
        }
    }

    if let Some(value) = page.attribute(element, "value").await? {
        if !value.trim().is_empty() {
            return Ok(value.trim().to_string());
        }
    }

    Ok(String::new())
}

/// Turn a camelCase or snake_case identifier into Title Case words.
pub fn humanize_name(name: &str) -> String {
    let spaced = SEPARATORS.replace_all(name, " ");
    let spaced = CAMEL_BOUNDARY.replace_all(&spaced, "$1 $2");
    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_adapter::{FakeElement, FakePage};

    #[test]
    fn humanize_handles_camel_and_snake_case() {
        assert_eq!(humanize_name("firstName"), "First Name");
        assert_eq!(humanize_name("first_name"), "First Name");
        assert_eq!(humanize_name("years-of-experience"), "Years Of Experience");
        assert_eq!(humanize_name("email"), "Email");
    }

    #[tokio::test]
    async fn label_for_association_wins() {
        let page = FakePage::new();
        let el = page.add(
            FakeElement::input("text")
                .attr("id", "fname")
                .attr("name", "firstName")
                .attr("placeholder", "Your first name")
                .wrapped_label("Wrapper text"),
        );
        page.set_label_for("fname", "First name ");

        let label = extract_label(&page, el, true).await.unwrap();
        assert_eq!(label, "First name");
    }

    #[tokio::test]
    async fn precedence_falls_through_to_name() {
        let page = FakePage::new();

        let wrapped = page.add(FakeElement::input("text").wrapped_label(" Wrapped "));
        assert_eq!(extract_label(&page, wrapped, true).await.unwrap(), "Wrapped");

        let aria = page.add(FakeElement::input("text").attr("aria-label", "Aria label"));
        assert_eq!(extract_label(&page, aria, true).await.unwrap(), "Aria label");

        let placeholder = page.add(FakeElement::input("text").attr("placeholder", "Type here"));
        assert_eq!(
            extract_label(&page, placeholder, true).await.unwrap(),
            "Type here"
        );
        // placeholder is skipped when nearby fallback is off
        assert_eq!(extract_label(&page, placeholder, false).await.unwrap(), "");

        let named = page.add(FakeElement::input("text").attr("name", "homeAddress"));
        assert_eq!(
            extract_label(&page, named, true).await.unwrap(),
            "Home Address"
        );

        let bare = page.add(FakeElement::input("text"));
        assert_eq!(extract_label(&page, bare, true).await.unwrap(), "");
    }

    #[tokio::test]
    async fn direct_label_ignores_name() {
        let page = FakePage::new();
        let named = page.add(FakeElement::input("radio").attr("name", "visa"));
        assert_eq!(extract_direct_label(&page, named, false).await.unwrap(), "");
    }

    #[tokio::test]
    async fn member_label_falls_back_to_value() {
        let page = FakePage::new();

        let wrapped = page.add(
            FakeElement::input("radio")
                .attr("name", "visa")
                .attr("value", "y")
                .wrapped_label("Yes"),
        );
        assert_eq!(radio_member_label(&page, wrapped).await.unwrap(), "Yes");

        let bare = page.add(
            FakeElement::input("radio")
                .attr("name", "visa")
                .attr("value", "No"),
        );
        assert_eq!(radio_member_label(&page, bare).await.unwrap(), "No");
    }
}
