//! Prompt loader for YAML prompt definitions.

use crate::types::PromptDefinition;
use coachbot_core::config::DEFAULT_PROMPT_ID;
use coachbot_core::{AppError, AppResult};
use std::path::Path;

/// Placeholders every template must render.
const REQUIRED_PLACEHOLDERS: &[&str] = &["context", "question"];

/// The default definition shipped with the binary.
const BUILTIN_DEFAULT: &str = include_str!("../prompts/coach.default.yml");

/// Load a prompt definition by ID from the workspace.
///
/// Looks for `<id>.yml` in `.coachbot/prompts/`. When no such file exists
/// and `prompt_id` is the default id, the built-in definition is used.
///
/// # Arguments
/// * `workspace_path` - Root workspace directory containing `.coachbot/`
/// * `prompt_id` - Prompt identifier (e.g., "coach.default")
///
/// # Example
/// ```no_run
/// use coachbot_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "coach.default")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path
        .join(".coachbot/prompts")
        .join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        if prompt_id == DEFAULT_PROMPT_ID {
            tracing::debug!("No workspace override, using built-in prompt {}", prompt_id);
            return builtin_prompt();
        }
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

    let definition = parse_prompt(&contents)
        .map_err(|e| AppError::Prompt(format!("{:?}: {}", prompt_file, e)))?;

    if definition.id != prompt_id {
        tracing::warn!(
            "Prompt file {:?} declares id '{}', expected '{}'",
            prompt_file,
            definition.id,
            prompt_id
        );
    }

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// The built-in `coach.default` definition.
pub fn builtin_prompt() -> AppResult<PromptDefinition> {
    parse_prompt(BUILTIN_DEFAULT)
}

fn parse_prompt(contents: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML: {}", e)))?;

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

    if def.api_version.is_empty() {
        return Err(AppError::Prompt(
            "Prompt apiVersion cannot be empty".to_string(),
        ));
    }

    if def.system.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt system instructions cannot be empty".to_string(),
        ));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    let compact: String = def.template.split_whitespace().collect();
    for placeholder in REQUIRED_PLACEHOLDERS {
        if !compact.contains(&format!("{{{{{}}}}}", placeholder)) {
            return Err(AppError::Prompt(format!(
                "Prompt template must reference {{{{{}}}}}",
                placeholder
            )));
        }
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
