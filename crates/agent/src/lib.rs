//! Query routing agent.
//!
//! Sends each query to one of three workflows: a safe calculator, an
//! encyclopedia-backed dictionary, or retrieval-augmented generation over the
//! workspace knowledge base.
//!
//! # Example
//! ```no_run
//! use triage_agent::Agent;
//! use triage_core::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! let agent = Agent::from_config(&config)?;
//! let result = agent.process("calculate 25 * 4").await;
//! println!("{}", result.answer());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod classify;
pub mod extract;
pub mod generator;
pub mod tools;
pub mod types;

pub use agent::Agent;
pub use classify::{QueryClassifier, Workflow};
pub use generator::{LlmTextGenerator, ResilientGenerator, TextGenerator};
pub use tools::{
    CalculatorTool, DictionaryTool, Encyclopedia, ExpressionEvaluator, LookupError,
    SafeEvaluator, WikipediaClient,
};
pub use types::{
    format_number, AnswerResult, CalculationResult, DefinitionResult, Status,
    NO_RELEVANT_INFORMATION,
};

#[cfg(test)]
mod tests;
