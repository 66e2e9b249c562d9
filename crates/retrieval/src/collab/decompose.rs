//! Product decomposition through the LLM, and the cache in front of it.

use super::{first_json_object, DecompositionService};
use crate::types::ProductDecomposition;
use async_trait::async_trait;
use regscout_core::config::CacheConfig;
use regscout_core::{AppError, AppResult};
use regscout_llm::{LlmClient, LlmRequest};
use regscout_prompt::{build_prompt, PromptDefinition};
use serde_json::json;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

pub struct LlmDecomposer {
    llm: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
}

impl LlmDecomposer {
    /// `prompt` is normally the `decompose.product` definition.
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, prompt: PromptDefinition) -> Self {
        Self {
            llm,
            model: model.into(),
            prompt,
        }
    }
}

#[async_trait]
impl DecompositionService for LlmDecomposer {
    async fn decompose(&self, product_name: &str) -> AppResult<ProductDecomposition> {
        let built = build_prompt(&self.prompt, &json!({ "product": product_name }))?;

        let mut request = LlmRequest::new(built.user, &self.model)
            .with_temperature(built.sampling.temperature.unwrap_or(0.0));
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = built.sampling.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.llm.complete(&request).await?;

        let object = first_json_object(&response.content).ok_or_else(|| {
            AppError::Retrieval(format!(
                "Decomposition of '{}' returned no JSON object",
                product_name
            ))
        })?;
        let decomposition: ProductDecomposition = serde_json::from_str(object).map_err(|e| {
            AppError::Retrieval(format!("Invalid decomposition for '{}': {}", product_name, e))
        })?;

        tracing::debug!(
            "Decomposed '{}': category={}, origin={}, {} ingredients",
            product_name,
            decomposition.category,
            decomposition.origin,
            decomposition.ingredients.len()
        );

        Ok(decomposition)
    }
}

/// Bounded, expiring decomposition cache keyed by normalized product name.
///
/// Owned by the calling layer and handed to the orchestrator. A capacity of
/// zero disables caching.
pub struct DecompositionCache {
    cache: Option<Cache<String, ProductDecomposition>>,
}

impl DecompositionCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let cache = (capacity > 0).then(|| {
            Cache::builder()
                .max_capacity(capacity as u64)
                .time_to_live(ttl)
                .build()
        });
        Self { cache }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, Duration::from_secs(config.ttl_secs))
    }

    fn key(product_name: &str) -> String {
        product_name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    pub fn get(&self, product_name: &str) -> Option<ProductDecomposition> {
        self.cache.as_ref()?.get(&Self::key(product_name))
    }

    pub fn insert(&self, product_name: &str, value: ProductDecomposition) {
        if let Some(cache) = &self.cache {
            cache.insert(Self::key(product_name), value);
        }
    }

    /// Number of live entries, after pending evictions have been applied.
    pub fn len(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| {
            cache.run_pending_tasks();
            cache.entry_count() as usize
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
