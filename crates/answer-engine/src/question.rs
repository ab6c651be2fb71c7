//! Turning field metadata into an answerable question.

use formpilot_core_types::{FieldType, FormField};

const TEXT_MAX_LENGTH: usize = 500;
const TEXTAREA_MAX_LENGTH: usize = 2000;

/// Build the question for a field: the label, the placeholder in
/// parentheses when it adds information, a question mark when missing.
pub fn construct_question(field: &FormField) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !field.label.is_empty() {
        parts.push(field.label.clone());
    }
    if !field.placeholder.is_empty() && field.placeholder != field.label {
        parts.push(format!("({})", field.placeholder));
    }

    let mut question = parts.join(" ").trim().to_string();
    if !question.ends_with('?') {
        question.push('?');
    }
    question
}

/// Default answer-length cap per field type.
pub fn max_length_for(field_type: FieldType) -> Option<usize> {
    match field_type {
        FieldType::Text | FieldType::Email | FieldType::Phone => Some(TEXT_MAX_LENGTH),
        FieldType::Textarea => Some(TEXTAREA_MAX_LENGTH),
        FieldType::Select
        | FieldType::Radio
        | FieldType::Checkbox
        | FieldType::Date
        | FieldType::Number
        | FieldType::File
        | FieldType::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formpilot_core_types::ElementHandle;

    fn field(label: &str, placeholder: &str) -> FormField {
        FormField::new(ElementHandle(0), FieldType::Text, label, "f")
            .with_placeholder(placeholder)
    }

    #[test]
    fn label_and_placeholder_combine() {
        assert_eq!(
            construct_question(&field("Email address", "you@company.com")),
            "Email address (you@company.com)?"
        );
    }

    #[test]
    fn duplicate_placeholder_is_dropped() {
        assert_eq!(construct_question(&field("Email", "Email")), "Email?");
    }

    #[test]
    fn existing_question_mark_is_kept() {
        assert_eq!(
            construct_question(&field("Are you authorized to work?", "")),
            "Are you authorized to work?"
        );
    }

    #[test]
    fn empty_metadata_still_yields_a_question_mark() {
        assert_eq!(construct_question(&field("", "")), "?");
    }

    #[test]
    fn length_caps_per_type() {
        assert_eq!(max_length_for(FieldType::Text), Some(500));
        assert_eq!(max_length_for(FieldType::Email), Some(500));
        assert_eq!(max_length_for(FieldType::Textarea), Some(2000));
        assert_eq!(max_length_for(FieldType::Select), None);
        assert_eq!(max_length_for(FieldType::Date), None);
    }
}
