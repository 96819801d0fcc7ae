//! Human-readable rendering of answers.

use std::fmt::Write;
use triage_agent::{format_number, AnswerResult};

const RULE_WIDTH: usize = 50;
const PASSAGE_RULE_WIDTH: usize = 30;

/// Render a result as the query, workflow and answer, then the
/// workflow-specific details.
pub fn render(result: &AnswerResult) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "\n{}", rule);
    let _ = writeln!(out, "Query: {}", result.query());
    let _ = writeln!(out, "Workflow: {}", capitalize(result.workflow().as_str()));
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "\nAnswer:\n{}", result.answer());

    match result {
        AnswerResult::Rag { retrieved_docs, .. } if !retrieved_docs.is_empty() => {
            let _ = writeln!(out, "\nRetrieved Documents:");
            for (i, doc) in retrieved_docs.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "\nDocument {} (Relevance: {:.4}):",
                    i + 1,
                    doc.relevance_score
                );
                let _ = writeln!(out, "{}", "-".repeat(PASSAGE_RULE_WIDTH));
                let _ = writeln!(out, "{}", doc.content);
            }
        }
        AnswerResult::Calculator { result, .. } => {
            if let Some(value) = result.value {
                let _ = writeln!(out, "\nCalculation Details:");
                let _ = writeln!(out, "Expression: {}", result.expression);
                let _ = writeln!(out, "Result: {}", format_number(value));
            }
        }
        AnswerResult::Dictionary { result, .. } => {
            if result.definition.is_some() {
                let _ = writeln!(out, "\nDefinition Details:");
                let _ = writeln!(out, "Term: {}", result.term);
                if let Some(note) = &result.note {
                    let _ = writeln!(out, "Note: {}", note);
                }
            }
        }
        AnswerResult::Rag { .. } => {}
    }

    let _ = writeln!(out, "\n{}", rule);
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_agent::{CalculationResult, DefinitionResult};
    use triage_knowledge::RetrievedPassage;

    #[test]
    fn test_render_calculation() {
        let result = AnswerResult::Calculator {
            query: "calculate 25 * 4".to_string(),
            answer: "The result is 100".to_string(),
            result: CalculationResult::success("25 * 4", 100.0),
        };

        let text = render(&result);
        assert!(text.contains("Query: calculate 25 * 4"));
        assert!(text.contains("Workflow: Calculator"));
        assert!(text.contains("Answer:\nThe result is 100"));
        assert!(text.contains("Expression: 25 * 4"));
        assert!(text.contains("Result: 100"));
    }

    #[test]
    fn test_render_definition_note() {
        let result = AnswerResult::Dictionary {
            query: "define mercury".to_string(),
            answer: "Mercury is a planet.".to_string(),
            result: DefinitionResult::success("Mercury (planet)", "Mercury is a planet.")
                .with_note("Multiple matches found. Showing definition for 'Mercury (planet)'"),
        };

        let text = render(&result);
        assert!(text.contains("Workflow: Dictionary"));
        assert!(text.contains("Term: Mercury (planet)"));
        assert!(text.contains("Note: Multiple matches found."));
    }

    #[test]
    fn test_render_passages() {
        let result = AnswerResult::Rag {
            query: "q".to_string(),
            answer: "a".to_string(),
            retrieved_docs: vec![RetrievedPassage {
                content: "Passage text".to_string(),
                relevance_score: 0.5,
                metadata: serde_json::Map::new(),
            }],
        };

        let text = render(&result);
        assert!(text.contains("Workflow: Rag"));
        assert!(text.contains("Document 1 (Relevance: 0.5000):"));
        assert!(text.contains("Passage text"));
    }

    #[test]
    fn test_render_failed_calculation_has_no_details() {
        let result = AnswerResult::Calculator {
            query: "calculate 1 / 0".to_string(),
            answer: "Error: division by zero".to_string(),
            result: CalculationResult::failure("1 / 0", "division by zero"),
        };

        assert!(!render(&result).contains("Calculation Details"));
    }
}
