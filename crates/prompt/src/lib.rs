//! Prompt system for regscout.
//!
//! YAML prompt definitions, built in and overridable per workspace, rendered
//! with Handlebars.

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

pub use builder::build_prompt;
pub use builtin::{ANSWER_AUGMENTED, ANSWER_DIRECT, DECOMPOSE_PRODUCT, REASONING_STEP};
pub use loader::{list_prompts, load_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptOutputSpec, PromptSampling};
