//! Embedding provider trait and factory.

use super::providers::{MockProvider, OllamaProvider, OpenAiProvider};
use regscout_core::config::SearchConfig;
use regscout_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Search("No embedding returned".to_string()))
    }
}

/// Create the embedding provider that vectorizes partition queries.
///
/// `api_key` is only consulted by the OpenAI provider.
pub fn create_provider(
    config: &SearchConfig,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let timeout = Duration::from_secs(config.request_timeout_secs.max(1));

    match config.embedding_provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::new(config.embedding_dimensions))),

        "ollama" => Ok(Arc::new(OllamaProvider::new(
            config.embedding_endpoint.as_deref(),
            &config.embedding_model,
            config.embedding_dimensions,
            timeout,
        )?)),

        "openai" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI embedding provider requires an API key".to_string())
            })?;
            Ok(Arc::new(OpenAiProvider::new(
                config.embedding_endpoint.as_deref(),
                api_key,
                &config.embedding_model,
                config.embedding_dimensions,
                timeout,
            )?))
        }

        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, ollama, openai",
            other
        ))),
    }
}
