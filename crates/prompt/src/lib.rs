//! Prompt system for triage.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions, overridable per workspace
//! - Built-in defaults compiled into the binary
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

/// Identifier of the prompt used to answer from retrieved context.
pub const RAG_ANSWER_PROMPT: &str = "rag.answer";

// Re-export main types
pub use builder::build_prompt;
pub use loader::{builtin_prompt, load_or_builtin, load_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, GenerationSettings, PromptDefinition};
