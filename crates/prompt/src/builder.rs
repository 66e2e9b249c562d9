//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use regscout_core::{AppError, AppResult};
use serde_json::Value;

/// Build a prompt from a definition and a JSON object of variables.
///
/// Both the system message and the template are rendered with the same
/// variables. Variables may be nested (`{{#each partitions}}`).
///
/// # Example
/// ```no_run
/// use regscout_prompt::{build_prompt, PromptDefinition};
/// use serde_json::json;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let built = build_prompt(&def, &json!({ "question": "Do I need FSVP?" }))?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(definition: &PromptDefinition, variables: &Value) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    if !variables.is_object() {
        return Err(AppError::Prompt(format!(
            "Variables for prompt {} must be a JSON object",
            definition.id
        )));
    }

    let user = render_template(&definition.template, variables)?;
    let system = definition
        .system
        .as_deref()
        .map(|s| render_template(s, variables))
        .transpose()?
        .map(|s| s.trim_end().to_string());

    let resolved_variables = variables
        .as_object()
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default();

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.sampling.clone(),
        definition.id.clone(),
        resolved_variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &Value) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}
