//! Per-field-type normalization of raw completion text.

use formpilot_core_types::FieldType;
use once_cell::sync::Lazy;
use regex::Regex;

static FULL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,2}[/-]\d{1,2}[/-]\d{2,4}").expect("full date regex"));
static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,2}[/-]\d{4}").expect("month/year regex"));
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digit run regex"));

/// Normalize a raw answer for its field type.
///
/// Selection answers snap onto the canonically-cased option on a
/// case-insensitive exact match and otherwise pass through for the filler's
/// fuzzy resolution. Checkboxes collapse to Yes/No, dates and numbers are
/// extracted, everything else is trimmed.
pub fn post_process(raw: &str, field_type: FieldType, options: Option<&[String]>) -> String {
    let answer = raw.trim();

    match field_type {
        FieldType::Select | FieldType::Radio => {
            if let Some(options) = options.filter(|opts| !opts.is_empty()) {
                for option in options {
                    if option.eq_ignore_ascii_case(answer) {
                        return option.clone();
                    }
                }
            }
            answer.to_string()
        }
        FieldType::Checkbox => {
            let lowered = answer.to_lowercase();
            if ["yes", "true", "correct", "agree"]
                .iter()
                .any(|word| lowered.contains(word))
            {
                "Yes".to_string()
            } else {
                "No".to_string()
            }
        }
        FieldType::Date => {
            if let Some(found) = FULL_DATE.find(answer) {
                return found.as_str().to_string();
            }
            if let Some(found) = MONTH_YEAR.find(answer) {
                return found.as_str().to_string();
            }
            answer.to_string()
        }
        FieldType::Number => match DIGIT_RUN.find(answer) {
            Some(found) => found.as_str().to_string(),
            None => answer.to_string(),
        },
        FieldType::Text
        | FieldType::Textarea
        | FieldType::Email
        | FieldType::Phone
        | FieldType::File
        | FieldType::Unknown => answer.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn select_snaps_to_canonical_casing() {
        let options = opts(&["Yes", "No", "Prefer not to say"]);
        assert_eq!(
            post_process("  yes  ", FieldType::Select, Some(&options)),
            "Yes"
        );
        assert_eq!(
            post_process("PREFER NOT TO SAY", FieldType::Radio, Some(&options)),
            "Prefer not to say"
        );
    }

    #[test]
    fn select_without_exact_match_passes_through() {
        let options = opts(&["Yes", "No"]);
        assert_eq!(
            post_process("  Absolutely  ", FieldType::Select, Some(&options)),
            "Absolutely"
        );
        // no options: trimmed pass-through
        assert_eq!(post_process(" yes ", FieldType::Select, None), "yes");
    }

    #[test]
    fn checkbox_normalizes_to_yes_no() {
        assert_eq!(post_process("yes, I agree", FieldType::Checkbox, None), "Yes");
        assert_eq!(post_process("That is correct", FieldType::Checkbox, None), "Yes");
        assert_eq!(post_process("True", FieldType::Checkbox, None), "Yes");
        assert_eq!(post_process("nope", FieldType::Checkbox, None), "No");
        assert_eq!(post_process("", FieldType::Checkbox, None), "No");
    }

    #[test]
    fn date_extracts_embedded_dates() {
        assert_eq!(
            post_process("Graduated in 05/2020 with honors", FieldType::Date, None),
            "05/2020"
        );
        assert_eq!(
            post_process("Started on 03/15/2019.", FieldType::Date, None),
            "03/15/2019"
        );
        assert_eq!(post_process("12-01-21", FieldType::Date, None), "12-01-21");
        // nothing date-shaped passes through
        assert_eq!(post_process("N/A", FieldType::Date, None), "N/A");
    }

    #[test]
    fn number_extracts_first_digit_run() {
        assert_eq!(
            post_process("I have 5 years and 3 months", FieldType::Number, None),
            "5"
        );
        assert_eq!(post_process("none", FieldType::Number, None), "none");
    }

    #[test]
    fn free_text_is_trimmed_pass_through() {
        assert_eq!(
            post_process("  jane@example.com  ", FieldType::Email, None),
            "jane@example.com"
        );
        assert_eq!(post_process(" hi ", FieldType::Textarea, None), "hi");
    }
}
