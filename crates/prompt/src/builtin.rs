//! Prompt definitions compiled into the binary.
//!
//! A workspace can shadow any of these by dropping `<id>.yml` into
//! `.regscout/prompts/`.

pub const ANSWER_DIRECT: &str = "answer.direct";
pub const ANSWER_AUGMENTED: &str = "answer.augmented";
pub const REASONING_STEP: &str = "reasoning.step";
pub const DECOMPOSE_PRODUCT: &str = "decompose.product";

const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (ANSWER_DIRECT, include_str!("../prompts/answer.direct.yml")),
    (
        ANSWER_AUGMENTED,
        include_str!("../prompts/answer.augmented.yml"),
    ),
    (REASONING_STEP, include_str!("../prompts/reasoning.step.yml")),
    (
        DECOMPOSE_PRODUCT,
        include_str!("../prompts/decompose.product.yml"),
    ),
];

/// Raw YAML of a built-in prompt.
pub fn builtin_source(prompt_id: &str) -> Option<&'static str> {
    BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .map(|(_, src)| *src)
}

/// IDs of every built-in prompt.
pub fn builtin_ids() -> impl Iterator<Item = &'static str> {
    BUILTIN_PROMPTS.iter().map(|(id, _)| *id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PromptDefinition;

    #[test]
    fn test_every_builtin_parses_and_matches_its_id() {
        for id in builtin_ids() {
            let src = builtin_source(id).unwrap();
            let def: PromptDefinition = serde_yaml::from_str(src).unwrap();
            assert_eq!(def.id, id);
            assert!(def.system.is_some(), "{} has no system message", id);
        }
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(builtin_source("nope").is_none());
    }
}
