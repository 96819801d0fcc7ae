//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use std::collections::HashMap;
use triage_core::{AppError, AppResult};

/// Build a prompt from a definition and input variables.
///
/// Renders the template (and the system message, when present) with
/// Handlebars and returns a `BuiltPrompt` ready for LLM execution.
///
/// # Example
/// ```no_run
/// use triage_prompt::{build_prompt, builtin_prompt, RAG_ANSWER_PROMPT};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt(RAG_ANSWER_PROMPT)?;
/// let mut vars = HashMap::new();
/// vars.insert("context".to_string(), "Osmosis is diffusion of water.".to_string());
/// vars.insert("question".to_string(), "What is osmosis?".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let user = render_template(&definition.template, &variables)?;
    let system = definition
        .system
        .as_deref()
        .map(|system| render_template(system, &variables))
        .transpose()?;

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.generation.clone(),
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Prompts are plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationSettings;

    fn create_test_definition(system: Option<&str>) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            system: system.map(str::to_string),
            generation: GenerationSettings {
                temperature: Some(0.1),
                max_tokens: None,
            },
            template: "Context: {{context}}\nQuestion: {{question}}".to_string(),
        }
    }

    fn vars(context: &str, question: &str) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), context.to_string());
        vars.insert("question".to_string(), question.to_string());
        vars
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Hello, world!".to_string());

        let result = render_template("Question: {{question}}", &vars).unwrap();
        assert_eq!(result, "Question: Hello, world!");
    }

    #[test]
    fn test_render_does_not_escape() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "is 1 < 2 && \"x\"?".to_string());

        let result = render_template("{{question}}", &vars).unwrap();
        assert_eq!(result, "is 1 < 2 && \"x\"?");
    }

    #[test]
    fn test_build_prompt_renders_user_and_system() {
        let def = create_test_definition(Some("Answer about {{question}}"));
        let built = build_prompt(&def, vars("Cells.", "osmosis")).unwrap();

        assert_eq!(built.user, "Context: Cells.\nQuestion: osmosis");
        assert_eq!(built.system.as_deref(), Some("Answer about osmosis"));
        assert_eq!(built.generation.temperature, Some(0.1));
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
    }

    #[test]
    fn test_build_prompt_without_system() {
        let def = create_test_definition(None);
        let built = build_prompt(&def, vars("a", "b")).unwrap();
        assert!(built.system.is_none());
    }

    #[test]
    fn test_render_template_missing_variable() {
        let vars = HashMap::new();
        // Handlebars renders missing variables as empty string
        let result = render_template("Question: {{missing}}", &vars).unwrap();
        assert_eq!(result, "Question: ");
    }

    #[test]
    fn test_render_template_invalid_syntax() {
        let result = render_template("{{#if}}", &HashMap::new());
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }
}
