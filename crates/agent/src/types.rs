//! Result types produced by the workflows.

use crate::classify::Workflow;
use serde::{Deserialize, Serialize};
use triage_knowledge::RetrievedPassage;

/// Fixed answer for a RAG query that retrieved nothing.
pub const NO_RELEVANT_INFORMATION: &str =
    "I couldn't find any relevant information in my knowledge base to answer your question.";

/// Outcome of a tool run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Result of the calculator workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub status: Status,
    pub expression: String,
    pub value: Option<f64>,
    pub error: Option<String>,
}

impl CalculationResult {
    pub fn success(expression: impl Into<String>, value: f64) -> Self {
        Self {
            status: Status::Success,
            expression: expression.into(),
            value: Some(value),
            error: None,
        }
    }

    pub fn failure(expression: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            expression: expression.into(),
            value: None,
            error: Some(error.into()),
        }
    }

    /// User-facing answer line.
    pub fn answer(&self) -> String {
        match (self.status, self.value) {
            (Status::Success, Some(value)) => format!("The result is {}", format_number(value)),
            _ => format!("Error: {}", self.error.as_deref().unwrap_or("unknown error")),
        }
    }
}

/// Result of the dictionary workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionResult {
    pub status: Status,
    pub term: String,
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub error: Option<String>,
}

impl DefinitionResult {
    pub fn success(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            term: term.into(),
            definition: Some(definition.into()),
            note: None,
            error: None,
        }
    }

    pub fn failure(term: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            term: term.into(),
            definition: None,
            note: None,
            error: Some(error.into()),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// User-facing answer line.
    pub fn answer(&self) -> String {
        match (&self.status, &self.definition) {
            (Status::Success, Some(definition)) => definition.clone(),
            _ => format!("Error: {}", self.error.as_deref().unwrap_or("unknown error")),
        }
    }
}

/// The answer to one query, tagged by the workflow that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "workflow", rename_all = "lowercase")]
pub enum AnswerResult {
    Calculator {
        query: String,
        answer: String,
        result: CalculationResult,
    },
    Dictionary {
        query: String,
        answer: String,
        result: DefinitionResult,
    },
    Rag {
        query: String,
        answer: String,
        retrieved_docs: Vec<RetrievedPassage>,
    },
}

impl AnswerResult {
    pub fn workflow(&self) -> Workflow {
        match self {
            AnswerResult::Calculator { .. } => Workflow::Calculator,
            AnswerResult::Dictionary { .. } => Workflow::Dictionary,
            AnswerResult::Rag { .. } => Workflow::Rag,
        }
    }

    pub fn query(&self) -> &str {
        match self {
            AnswerResult::Calculator { query, .. }
            | AnswerResult::Dictionary { query, .. }
            | AnswerResult::Rag { query, .. } => query,
        }
    }

    pub fn answer(&self) -> &str {
        match self {
            AnswerResult::Calculator { answer, .. }
            | AnswerResult::Dictionary { answer, .. }
            | AnswerResult::Rag { answer, .. } => answer,
        }
    }
}

/// Render a number without a trailing `.0` when it is integral.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
