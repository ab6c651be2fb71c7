//! Prompt templates for the different field types.
//!
//! Pure string assembly: (question, context, field type, options, limits) in,
//! prompt text out. Every template grounds the model strictly in the supplied
//! context, forbids fabrication and preamble, and asks for first-person voice
//! where free text is expected.

use formpilot_core_types::{FieldType, SimilarQuestion};

/// Marker line the few-shot splice inserts before.
///
/// Shared by the base builders and [`create_prompt_with_examples`] so the
/// template wording and the insertion point cannot drift apart.
pub const QUESTION_MARKER: &str = "Question:";

/// Build the prompt for one question.
///
/// Dispatches on field type: selection types get the option-enumerating
/// template, checkboxes the yes/no template, date and number their extraction
/// templates, everything else the free-text template.
pub fn create_prompt(
    question: &str,
    context: &[String],
    field_type: FieldType,
    options: Option<&[String]>,
    max_length: Option<usize>,
) -> String {
    match field_type {
        FieldType::Select | FieldType::Radio => {
            selection_prompt(question, context, options.unwrap_or(&[]))
        }
        FieldType::Checkbox => boolean_prompt(question, context),
        FieldType::Date => date_prompt(question, context),
        FieldType::Number => number_prompt(question, context),
        FieldType::Text
        | FieldType::Textarea
        | FieldType::Email
        | FieldType::Phone
        | FieldType::File
        | FieldType::Unknown => text_prompt(question, context, max_length),
    }
}

/// Build the few-shot variant: the base prompt for the field type with a
/// "Previous Similar Questions" block spliced in immediately before the
/// [`QUESTION_MARKER`] line.
///
/// At most the top three pairs are used. If the base template carries no
/// marker the examples are omitted and the base prompt returned unchanged.
pub fn create_prompt_with_examples(
    question: &str,
    context: &[String],
    similar: &[SimilarQuestion],
    field_type: FieldType,
) -> String {
    let base = create_prompt(question, context, field_type, None, None);

    if similar.is_empty() {
        return base;
    }

    let mut examples = String::from("\n\nPrevious Similar Questions (for reference):\n");
    for (i, pair) in similar.iter().take(3).enumerate() {
        examples.push_str(&format!(
            "\nExample {}:\nQ: {}\nA: {}\n",
            i + 1,
            pair.question,
            pair.answer
        ));
    }

    match base.find(QUESTION_MARKER) {
        Some(at) => {
            let (head, tail) = base.split_at(at);
            format!("{head}{examples}\n{tail}")
        }
        None => base,
    }
}

fn context_block(context: &[String]) -> String {
    context
        .iter()
        .enumerate()
        .map(|(i, ctx)| format!("Context {}:\n{}", i + 1, ctx))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn text_prompt(question: &str, context: &[String], max_length: Option<usize>) -> String {
    let length_instruction = max_length
        .map(|n| format!("\n- Keep your answer under {n} characters"))
        .unwrap_or_default();

    format!(
        "You are helping fill out a job application form. Answer the following question \
based ONLY on the provided context from the applicant's resume and documents.\n\
\n\
Context from Resume/Documents:\n\
{context}\n\
\n\
{marker} {question}\n\
\n\
Instructions:\n\
- Answer professionally and concisely\n\
- Base your answer ONLY on information from the context above\n\
- Do not make up or hallucinate information\n\
- If the context doesn't contain relevant information, say \"Information not available in documents\"{length_instruction}\n\
- Write in first person (I, my, etc.)\n\
- Do not include any preamble or explanation, just the answer\n\
\n\
Answer:",
        context = context_block(context),
        marker = QUESTION_MARKER,
    )
}

fn selection_prompt(question: &str, context: &[String], options: &[String]) -> String {
    let options_text = options
        .iter()
        .map(|opt| format!("- {opt}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are helping fill out a job application form. Select the MOST appropriate \
option from the list based on the provided context.\n\
\n\
Context from Resume/Documents:\n\
{context}\n\
\n\
{marker} {question}\n\
\n\
Available Options:\n\
{options_text}\n\
\n\
Instructions:\n\
- Choose the SINGLE best option that matches the context\n\
- Return ONLY the exact text of the option, nothing else\n\
- If no option is a good match, choose the closest one\n\
- Do not add any explanation or preamble\n\
\n\
Selected Option:",
        context = context_block(context),
        marker = QUESTION_MARKER,
    )
}

fn boolean_prompt(question: &str, context: &[String]) -> String {
    format!(
        "You are helping fill out a job application form. Answer the yes/no question \
based on the provided context.\n\
\n\
Context from Resume/Documents:\n\
{context}\n\
\n\
{marker} {question}\n\
\n\
Instructions:\n\
- Answer with ONLY \"Yes\" or \"No\"\n\
- Base your answer on the context provided\n\
- If uncertain, answer \"No\"\n\
- Do not add any explanation\n\
\n\
Answer (Yes/No):",
        context = context_block(context),
        marker = QUESTION_MARKER,
    )
}

fn date_prompt(question: &str, context: &[String]) -> String {
    format!(
        "You are helping fill out a job application form. Extract the relevant date \
from the context.\n\
\n\
Context from Resume/Documents:\n\
{context}\n\
\n\
{marker} {question}\n\
\n\
Instructions:\n\
- Extract the date in MM/YYYY or MM/DD/YYYY format\n\
- Return ONLY the date, nothing else\n\
- If no relevant date is found, return \"N/A\"\n\
- Do not add any explanation\n\
\n\
Date:",
        context = context_block(context),
        marker = QUESTION_MARKER,
    )
}

fn number_prompt(question: &str, context: &[String]) -> String {
    format!(
        "You are helping fill out a job application form. Extract the relevant number \
from the context.\n\
\n\
Context from Resume/Documents:\n\
{context}\n\
\n\
{marker} {question}\n\
\n\
Instructions:\n\
- Return ONLY the number (no units, no text)\n\
- If no relevant number is found, return \"0\"\n\
- Do not add any explanation\n\
\n\
Number:",
        context = context_block(context),
        marker = QUESTION_MARKER,
    )
}
