//! Multi-source retrieval orchestration for FDA food-import questions.
//!
//! A question (optionally about a named product) is turned into one query per
//! knowledge partition, searched concurrently, merged with per-partition
//! quotas, and checked for sufficiency. Sufficient evidence is answered
//! directly; insufficient evidence first goes through one bounded sequential
//! reasoning pass.
//!
//! # Example
//!
//! ```no_run
//! use regscout_core::AppConfig;
//! use regscout_retrieval::{build_orchestrator, AnswerRequest};
//!
//! # async fn run() -> regscout_core::AppResult<()> {
//! let config = AppConfig::load()?;
//! let orchestrator = build_orchestrator(&config)?;
//! let response = orchestrator
//!     .answer(AnswerRequest::new("Do I need FSVP for kimchi?").with_product("kimchi"))
//!     .await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod citations;
pub mod collab;
pub mod embeddings;
pub mod evidence;
pub mod fanout;
pub mod gate;
pub mod merge;
pub mod orchestrator;
pub mod qdrant;
pub mod query;
pub mod references;
pub mod registry;
pub mod search_client;
pub mod types;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

pub use citations::CitationResolver;
pub use collab::{
    AnswerAssembler, AssemblyRequest, DecompositionCache, DecompositionService,
    LlmAnswerAssembler, LlmDecomposer, LlmReasoner, SequentialReasoner,
};
pub use fanout::{CallOutcome, FanOutExecutor, FanOutResult, PartitionResults};
pub use gate::{GateCheck, SufficiencyGate, SufficiencyVerdict};
pub use merge::{top_n, MergeRanker};
pub use orchestrator::{
    AnswerPath, AnswerRequest, Orchestrator, OrchestratorResponse, SearchReport, FALLBACK_NOTICE,
};
pub use qdrant::QdrantSearchClient;
pub use query::{QueryInput, QueryTransformer};
pub use references::{extract_references, RegulationReference};
pub use registry::{group_results, PartitionGroup, PartitionRegistry, PartitionSpec};
pub use search_client::PartitionSearchClient;
pub use types::{Citation, MergedResult, PartitionId, ProductDecomposition, SearchHit};

use regscout_core::config::ProviderConfig;
use regscout_core::{AppConfig, AppResult};
use regscout_llm::create_client;
use regscout_prompt::{
    load_prompt, ANSWER_AUGMENTED, ANSWER_DIRECT, DECOMPOSE_PRODUCT, REASONING_STEP,
};
use std::sync::Arc;
use std::time::Duration;

/// Wire up the production orchestrator from configuration.
///
/// Search goes to Qdrant through the configured embedding provider; the
/// decomposer, reasoner and assembler all share one LLM client. Prompts
/// honour workspace overrides in `.regscout/prompts/`.
pub fn build_orchestrator(config: &AppConfig) -> AppResult<Orchestrator> {
    let registry = Arc::new(PartitionRegistry::from_app_config(config));

    let embedding_key = config.resolve_api_key("openai");
    let embedder = embeddings::create_provider(&config.search, embedding_key.as_deref())?;
    let search: Arc<dyn PartitionSearchClient> = Arc::new(QdrantSearchClient::new(
        &config.search,
        config.resolve_search_api_key(),
        embedder,
        config.retrieval.snippet_chars,
    )?);

    let timeout = match config.get_provider_config(&config.provider) {
        Some(ProviderConfig::Ollama {
            timeout: Some(secs),
            ..
        }) => Some(Duration::from_secs(*secs)),
        _ => None,
    };
    let api_key = config.resolve_api_key(&config.provider);
    let llm = create_client(
        &config.provider,
        config.provider_endpoint(),
        api_key.as_deref(),
        timeout,
    )?;
    let model = config.model.clone();

    let workspace = config.workspace.as_path();
    let decomposer = LlmDecomposer::new(
        Arc::clone(&llm),
        model.clone(),
        load_prompt(workspace, DECOMPOSE_PRODUCT)?,
    );
    let reasoner = LlmReasoner::new(
        Arc::clone(&llm),
        model.clone(),
        load_prompt(workspace, REASONING_STEP)?,
        Arc::clone(&search),
        Arc::clone(&registry),
    );
    let assembler = LlmAnswerAssembler::new(
        llm,
        model,
        load_prompt(workspace, ANSWER_DIRECT)?,
        load_prompt(workspace, ANSWER_AUGMENTED)?,
    );
    let cache = DecompositionCache::from_config(&config.retrieval.decomposition_cache);

    tracing::debug!(
        partitions = registry.len(),
        provider = %config.provider,
        model = %config.model,
        search = %config.search.endpoint,
        "Orchestrator ready"
    );

    Ok(Orchestrator::new(&config.retrieval, registry, search, Arc::new(assembler))
        .with_decomposer(Arc::new(decomposer), Some(Arc::new(cache)))
        .with_reasoner(Arc::new(reasoner)))
}
