//! Prompt loader for YAML prompt definitions.

use crate::builtin::{builtin_ids, builtin_source};
use crate::types::PromptDefinition;
use regscout_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".regscout/prompts")
}

/// Load a prompt definition by ID.
///
/// `<workspace>/.regscout/prompts/<id>.yml` wins when present; otherwise the
/// built-in definition of the same ID is used.
///
/// # Example
/// ```no_run
/// use regscout_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "answer.direct")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    let definition = if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);

        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;

        serde_yaml::from_str::<PromptDefinition>(&contents).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to parse prompt YAML {:?}: {}",
                prompt_file, e
            ))
        })?
    } else if let Some(src) = builtin_source(prompt_id) {
        serde_yaml::from_str::<PromptDefinition>(src).map_err(|e| {
            AppError::Prompt(format!("Built-in prompt {} is invalid: {}", prompt_id, e))
        })?
    } else {
        return Err(AppError::Prompt(format!(
            "Prompt not found: {} (no override at {:?} and no built-in)",
            prompt_id, prompt_file
        )));
    };

    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        tracing::warn!(
            "Prompt file for {} declares id {}; using it anyway",
            prompt_id,
            definition.id
        );
    }

    tracing::debug!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List every prompt ID available: built-ins plus workspace overrides.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let mut prompt_ids: Vec<String> = builtin_ids().map(str::to_string).collect();

    let dir = prompts_dir(workspace_path);
    if dir.exists() {
        for entry in walkdir::WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    prompt_ids.push(stem.to_string());
                }
            }
        }
    }

    prompt_ids.sort();
    prompt_ids.dedup();
    Ok(prompt_ids)
}

/// Validate that a prompt definition has all required fields.
fn validate_prompt(definition: &PromptDefinition) -> AppResult<()> {
    if definition.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if definition.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if !definition.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid API version format: {}",
            definition.api_version
        )));
    }

    if definition.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    Ok(())
}
