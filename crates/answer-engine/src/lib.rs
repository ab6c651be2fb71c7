//! Answer generation: retrieval, prompting, completion, post-processing.
//!
//! The generator owns the cost guard (no completion call without context)
//! and the error contract: service failures surface as an `error` field on
//! the result with the retrieved context preserved, never as a panic or a
//! lost answer.

use std::sync::Arc;

use context_retrieval::{ContextRetriever, RetrievalError};
use formpilot_core_types::{FieldType, FormField, GeneratedAnswer};
use llm_gateway::CompletionPort;
use prompt_templates::{create_prompt, create_prompt_with_examples};
use thiserror::Error;
use tracing::{debug, warn};

pub mod postprocess;
pub mod question;

pub use postprocess::post_process;
pub use question::{construct_question, max_length_for};

#[derive(Debug, Error)]
pub enum EngineError {
    /// The index service itself failed; distinct from "no context found".
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
}

pub struct AnswerGenerator {
    llm: Arc<dyn CompletionPort>,
    retriever: ContextRetriever,
    use_history: bool,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn CompletionPort>, retriever: ContextRetriever, use_history: bool) -> Self {
        Self {
            llm,
            retriever,
            use_history,
        }
    }

    /// Generate an answer for one question.
    ///
    /// With zero retrieved snippets the call short-circuits: no completion
    /// request is made and the result carries an explicit error marker.
    pub async fn generate_answer(
        &self,
        question: &str,
        field_type: FieldType,
        options: Option<&[String]>,
        max_length: Option<usize>,
    ) -> Result<GeneratedAnswer, EngineError> {
        let retrieval = self.retriever.retrieve_all(question).await?;

        if retrieval.context.is_empty() {
            warn!(question, "no relevant context found");
            return Ok(GeneratedAnswer::no_context());
        }

        let prompt = if self.use_history && !retrieval.similar_questions.is_empty() {
            create_prompt_with_examples(
                question,
                &retrieval.context,
                &retrieval.similar_questions,
                field_type,
            )
        } else {
            create_prompt(question, &retrieval.context, field_type, options, max_length)
        };

        let raw = match self.llm.complete(&prompt).await {
            Ok(text) => text,
            Err(err) => {
                warn!(question, %err, "error generating answer");
                return Ok(GeneratedAnswer::failed(err.to_string(), retrieval.context));
            }
        };

        let answer = post_process(&raw, field_type, options);
        debug!(question, answer = %answer, "generated answer");

        Ok(GeneratedAnswer {
            answer,
            confidence: retrieval.confidence,
            context_used: retrieval.context,
            similar_questions: if self.use_history {
                retrieval.similar_questions
            } else {
                Vec::new()
            },
            error: None,
        })
    }

    /// Generate an answer for a detected field: question text from the
    /// field metadata, options for choice types, length caps per type.
    pub async fn answer_for_field(
        &self,
        field: &FormField,
    ) -> Result<GeneratedAnswer, EngineError> {
        let question = construct_question(field);
        let options = if field.field_type.is_choice() {
            Some(field.options.as_slice())
        } else {
            None
        };

        self.generate_answer(
            &question,
            field.field_type,
            options,
            max_length_for(field.field_type),
        )
        .await
    }
}
