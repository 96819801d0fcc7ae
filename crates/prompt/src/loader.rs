//! Prompt loader for YAML prompt definitions.
//!
//! Workspace files under `.triage/prompts/<id>.yml` take precedence over the
//! built-in definitions compiled into the binary.

use crate::types::PromptDefinition;
use std::path::Path;
use triage_core::{AppError, AppResult};

/// Built-in prompt sources, keyed by id.
const BUILTIN_PROMPTS: &[(&str, &str)] = &[(
    crate::RAG_ANSWER_PROMPT,
    include_str!("../prompts/rag.answer.yml"),
)];

/// Load a prompt definition by ID from the workspace.
///
/// Looks for `<id>.yml` in the `.triage/prompts/` directory.
///
/// # Example
/// ```no_run
/// use triage_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "rag.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path
        .join(".triage/prompts")
        .join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition = parse_prompt(&contents, &format!("{:?}", prompt_file))?;
    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Return the built-in definition for `prompt_id`.
pub fn builtin_prompt(prompt_id: &str) -> AppResult<PromptDefinition> {
    let (_, source) = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("No built-in prompt: {}", prompt_id)))?;

    parse_prompt(source, prompt_id)
}

/// Load the workspace override for `prompt_id`, falling back to the built-in.
pub fn load_or_builtin(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let override_file = workspace_path
        .join(".triage/prompts")
        .join(format!("{}.yml", prompt_id));

    if override_file.exists() {
        load_prompt(workspace_path, prompt_id)
    } else {
        tracing::debug!("Using built-in prompt: {}", prompt_id);
        builtin_prompt(prompt_id)
    }
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e)))?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if let Some(temperature) = def.generation.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AppError::Prompt(format!(
                "Temperature out of range for {}: {}",
                def.id, temperature
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, content: &str) {
        let prompts_dir = dir.join(".triage/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();
        fs::write(prompts_dir.join(format!("{}.yml", id)), content).unwrap();
    }

    fn valid_prompt(id: &str) -> String {
        format!(
            r#"
id: {}
title: "Custom Prompt"
apiVersion: "1.0"
createdBy: test
template: "Custom: {{{{question}}}}"
"#,
            id
        )
    }

    #[test]
    fn test_load_valid_prompt() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "test.prompt", &valid_prompt("test.prompt"));

        let prompt = load_prompt(temp_dir.path(), "test.prompt").unwrap();
        assert_eq!(prompt.id, "test.prompt");
        assert_eq!(prompt.title, "Custom Prompt");
        assert_eq!(prompt.template, "Custom: {{question}}");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "invalid", "invalid: yaml: content:");
        assert!(load_prompt(temp_dir.path(), "invalid").is_err());
    }

    #[test]
    fn test_builtin_rag_answer() {
        let prompt = builtin_prompt(crate::RAG_ANSWER_PROMPT).unwrap();
        assert_eq!(prompt.id, "rag.answer");
        assert_eq!(prompt.generation.temperature, Some(0.1));
        assert!(prompt.template.contains("{{context}}"));
        assert!(prompt.template.contains("{{question}}"));
        assert!(prompt.template.ends_with("Answer:"));
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(builtin_prompt("no.such.prompt").is_err());
    }

    #[test]
    fn test_workspace_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "rag.answer", &valid_prompt("rag.answer"));

        let prompt = load_or_builtin(temp_dir.path(), "rag.answer").unwrap();
        assert_eq!(prompt.title, "Custom Prompt");
    }

    #[test]
    fn test_falls_back_to_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_or_builtin(temp_dir.path(), "rag.answer").unwrap();
        assert_eq!(prompt.generation.temperature, Some(0.1));
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(
            temp_dir.path(),
            "hot",
            r#"
id: hot
title: Hot
apiVersion: "1.0"
generation:
  temperature: 9.5
template: "x"
"#,
        );
        assert!(load_prompt(temp_dir.path(), "hot").is_err());
    }
}
