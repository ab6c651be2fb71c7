//! Input classification: explicit type mapping first, then keyword
//! inference over name/id/placeholder.

use formpilot_core_types::FieldType;

const EMAIL_KEYWORDS: &[&str] = &["email", "e-mail"];
const PHONE_KEYWORDS: &[&str] = &["phone", "tel", "mobile", "contact"];
const DATE_KEYWORDS: &[&str] = &["date", "dob", "birthday"];
const NUMBER_KEYWORDS: &[&str] = &["number", "years", "salary", "age"];

/// Classify a plain `<input>` control.
///
/// The explicit HTML type attribute wins; otherwise keyword sets are tested
/// in fixed order (email, phone, date, number) against the concatenated
/// name/id/placeholder, falling back to text.
pub fn classify_input(input_type: &str, name: &str, id: &str, placeholder: &str) -> FieldType {
    match input_type {
        "email" => return FieldType::Email,
        "tel" | "phone" => return FieldType::Phone,
        "date" => return FieldType::Date,
        "number" => return FieldType::Number,
        "text" => return FieldType::Text,
        _ => {}
    }

    let combined = format!(
        "{} {} {}",
        name.to_lowercase(),
        id.to_lowercase(),
        placeholder.to_lowercase()
    );

    if EMAIL_KEYWORDS.iter().any(|kw| combined.contains(kw)) {
        return FieldType::Email;
    }
    if PHONE_KEYWORDS.iter().any(|kw| combined.contains(kw)) {
        return FieldType::Phone;
    }
    if DATE_KEYWORDS.iter().any(|kw| combined.contains(kw)) {
        return FieldType::Date;
    }
    if NUMBER_KEYWORDS.iter().any(|kw| combined.contains(kw)) {
        return FieldType::Number;
    }

    FieldType::Text
}
