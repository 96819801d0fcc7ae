//! Tools behind the calculator and dictionary workflows.

pub mod calculator;
pub mod dictionary;
pub mod evaluator;
pub mod wikipedia;

pub use calculator::CalculatorTool;
pub use dictionary::{DictionaryTool, Encyclopedia, LookupError};
pub use evaluator::{ExpressionEvaluator, SafeEvaluator};
pub use wikipedia::WikipediaClient;
