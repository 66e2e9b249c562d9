//! Final answer assembly through the LLM.

use super::{AnswerAssembler, AssemblyRequest};
use crate::evidence::format_citations;
use async_trait::async_trait;
use regscout_core::{AppError, AppResult};
use regscout_llm::{LlmClient, LlmRequest};
use regscout_prompt::{build_prompt, PromptDefinition};
use serde_json::json;
use std::sync::Arc;

const DEFAULT_TEMPERATURE: f32 = 0.1;

pub struct LlmAnswerAssembler {
    llm: Arc<dyn LlmClient>,
    model: String,
    direct: PromptDefinition,
    augmented: PromptDefinition,
}

impl LlmAnswerAssembler {
    /// `direct` answers from merged evidence alone; `augmented` also gets
    /// the reasoning transcript.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        direct: PromptDefinition,
        augmented: PromptDefinition,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            direct,
            augmented,
        }
    }
}

#[async_trait]
impl AnswerAssembler for LlmAnswerAssembler {
    async fn assemble(&self, request: &AssemblyRequest) -> AppResult<String> {
        let transcript = request
            .transcript
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let definition = if transcript.is_some() {
            &self.augmented
        } else {
            &self.direct
        };

        let built = build_prompt(
            definition,
            &json!({
                "question": request.query,
                "product": request.product_name,
                "evidence": request.evidence,
                "citations": format_citations(&request.citations),
                "transcript": transcript,
                "reducedDepth": request.reduced_depth,
            }),
        )?;

        let mut llm_request = LlmRequest::new(built.user, &self.model)
            .with_temperature(built.sampling.temperature.unwrap_or(DEFAULT_TEMPERATURE));
        if let Some(system) = built.system {
            llm_request = llm_request.with_system(system);
        }
        if let Some(max_tokens) = built.sampling.max_tokens {
            llm_request = llm_request.with_max_tokens(max_tokens);
        }

        tracing::debug!(
            prompt = %built.metadata.source_prompt_id,
            citations = request.citations.len(),
            "Assembling answer"
        );

        let response = self.llm.complete(&llm_request).await?;
        let content = response.content.trim();
        if content.is_empty() {
            return Err(AppError::Retrieval(
                "Answer assembly returned an empty reply".to_string(),
            ));
        }

        Ok(content.to_string())
    }
}
