//! LLM integration crate for triage.
//!
//! This crate provides a provider-agnostic abstraction for interacting with
//! Large Language Models (LLMs), plus the bounded retry machinery used to
//! survive rate-limited upstreams.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **Gemini**: Google Generative Language API
//!
//! # Example
//! ```no_run
//! use triage_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod retry;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{GeminiClient, OllamaClient};
pub use retry::{
    run_with_retry, DefaultFailureClassifier, FailureClassifier, FailureKind, RetryOutcome,
    RetryPolicy, RetryState, Sleeper, TokioSleeper,
};
pub use types::ProviderType;
