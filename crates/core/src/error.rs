//! Error types for the triage workspace.
//!
//! This module defines a unified error enum that covers the error categories
//! raised by configuration, I/O, LLM providers, the knowledge base, external
//! lookups, expression evaluation and prompt rendering.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for triage.
///
/// Fallible plumbing returns `Result<T, AppError>`. Only the workflow
/// orchestrator turns these into user-facing text.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors that carry no more specific classification
    #[error("LLM error: {0}")]
    Llm(String),

    /// Upstream rejected the request because of a rate limit or exhausted quota.
    ///
    /// `retry_after` holds the delay suggested by the provider, if any.
    #[error("Rate limited (429): {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Upstream rejected the credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Knowledge base and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Encyclopedia lookup errors
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Arithmetic expression errors
    #[error("{0}")]
    Evaluation(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
