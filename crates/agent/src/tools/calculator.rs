//! Calculator workflow.

use super::evaluator::{ExpressionEvaluator, SafeEvaluator};
use crate::extract::{extract_expression, normalize_expression};
use crate::types::CalculationResult;
use std::sync::Arc;

/// Extracts an expression from a query and evaluates it.
#[derive(Clone)]
pub struct CalculatorTool {
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new(Arc::new(SafeEvaluator))
    }
}

impl CalculatorTool {
    pub fn new(evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        Self { evaluator }
    }

    pub fn run(&self, query: &str) -> CalculationResult {
        let Some(expression) = extract_expression(query) else {
            return CalculationResult::failure(
                "",
                "No valid mathematical expression found in the query",
            );
        };

        let normalized = normalize_expression(&expression);
        tracing::debug!("Evaluating expression: {}", normalized);

        match self.evaluator.evaluate(&normalized) {
            Ok(value) => CalculationResult::success(normalized, value),
            Err(e) => {
                tracing::debug!("Evaluation failed for {:?}: {}", normalized, e);
                CalculationResult::failure(normalized, e.to_string())
            }
        }
    }
}
