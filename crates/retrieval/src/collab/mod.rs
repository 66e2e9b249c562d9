//! External collaborators the orchestrator calls through narrow traits, plus
//! LLM-backed implementations of each.

pub mod assemble;
pub mod decompose;
pub mod reasoning;

pub use assemble::LlmAnswerAssembler;
pub use decompose::{DecompositionCache, LlmDecomposer};
pub use reasoning::LlmReasoner;

use crate::types::{Citation, ProductDecomposition};
use async_trait::async_trait;
use regscout_core::AppResult;

/// Turns a product name into a structured description.
#[async_trait]
pub trait DecompositionService: Send + Sync {
    async fn decompose(&self, product_name: &str) -> AppResult<ProductDecomposition>;
}

/// Deeper, sequential evidence gathering for the augmented path.
#[async_trait]
pub trait SequentialReasoner: Send + Sync {
    /// Returns a transcript of what was looked up and found.
    async fn run(&self, query: &str, prior_evidence_summary: &str) -> AppResult<String>;
}

/// Everything answer assembly gets to see.
#[derive(Debug, Clone, Default)]
pub struct AssemblyRequest {
    pub query: String,
    pub product_name: Option<String>,
    /// Numbered evidence blocks
    pub evidence: String,
    pub citations: Vec<Citation>,
    /// Sequential reasoning transcript, augmented path only
    pub transcript: Option<String>,
    /// The augmented pass was wanted but failed
    pub reduced_depth: bool,
}

/// Produces the final prose answer.
#[async_trait]
pub trait AnswerAssembler: Send + Sync {
    async fn assemble(&self, request: &AssemblyRequest) -> AppResult<String>;
}

/// Extract the first balanced `{...}` object from an LLM reply.
///
/// Models wrap JSON in prose or code fences often enough that parsing the
/// whole reply is not an option.
pub(crate) fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_json_object_in_prose() {
        let reply = "Sure! ```json\n{\"a\": {\"b\": \"}\"}, \"c\": 1}\n``` done {\"x\":2}";
        assert_eq!(first_json_object(reply), Some("{\"a\": {\"b\": \"}\"}, \"c\": 1}"));
    }

    #[test]
    fn test_first_json_object_unbalanced() {
        assert_eq!(first_json_object("{\"a\": 1"), None);
        assert_eq!(first_json_object("no json"), None);
    }
}
