//! Request-level control flow: decompose, fan out, merge, gate, then answer
//! on the direct or augmented path.

use crate::citations::CitationResolver;
use crate::collab::{
    AnswerAssembler, AssemblyRequest, DecompositionCache, DecompositionService,
    SequentialReasoner,
};
use crate::evidence::{already_retrieved, format_context};
use crate::fanout::{millis, FanOutExecutor, FanOutResult};
use crate::gate::{SufficiencyGate, SufficiencyVerdict};
use crate::merge::MergeRanker;
use crate::query::QueryTransformer;
use crate::references::{extract_references, RegulationReference};
use crate::registry::PartitionRegistry;
use crate::search_client::PartitionSearchClient;
use crate::types::{Citation, MergedResult, PartitionId, ProductDecomposition};
use chrono::{DateTime, Utc};
use regscout_core::config::RetrievalConfig;
use regscout_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

pub const FALLBACK_NOTICE: &str =
    "Sorry, an error occurred while preparing the answer. Please try again shortly.";

/// One question, optionally about a named product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub query: String,
    pub product_name: Option<String>,
    /// Skips the decomposition service when already known
    pub decomposition: Option<ProductDecomposition>,
    /// Partitions to search; empty means every registered partition
    pub partitions: Vec<String>,
}

impl AnswerRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_product(mut self, product_name: impl Into<String>) -> Self {
        self.product_name = Some(product_name.into());
        self
    }

    pub fn with_decomposition(mut self, decomposition: ProductDecomposition) -> Self {
        self.decomposition = Some(decomposition);
        self
    }

    pub fn with_partitions<I, S>(mut self, partitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partitions = partitions.into_iter().map(Into::into).collect();
        self
    }
}

/// Which way the answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerPath {
    /// Gate passed; answer straight from merged evidence
    Direct,
    /// Gate failed; answer from merged evidence plus a reasoning transcript
    Augmented,
    /// Gate failed and the reasoning pass could not run
    ReducedDepth,
    /// Something went wrong; content is the fixed notice
    Fallback,
}

impl fmt::Display for AnswerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnswerPath::Direct => "direct",
            AnswerPath::Augmented => "augmented",
            AnswerPath::ReducedDepth => "reduced_depth",
            AnswerPath::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorResponse {
    pub content: String,
    pub citations: Vec<Citation>,
    /// Partitions that contributed evidence, in rank order of first hit
    pub partitions: Vec<PartitionId>,
    pub references: Vec<RegulationReference>,
    pub keywords: Vec<String>,
    pub path: AnswerPath,
    pub verdict: Option<SufficiencyVerdict>,
    #[serde(rename = "search_elapsed_ms", with = "millis")]
    pub search_elapsed: Duration,
    #[serde(rename = "total_elapsed_ms", with = "millis")]
    pub total_elapsed: Duration,
    pub answered_at: DateTime<Utc>,
}

impl OrchestratorResponse {
    fn fallback(
        verdict: Option<SufficiencyVerdict>,
        search_elapsed: Duration,
        started: Instant,
    ) -> Self {
        Self {
            content: FALLBACK_NOTICE.to_string(),
            citations: Vec::new(),
            partitions: Vec::new(),
            references: Vec::new(),
            keywords: Vec::new(),
            path: AnswerPath::Fallback,
            verdict,
            search_elapsed,
            total_elapsed: started.elapsed(),
            answered_at: Utc::now(),
        }
    }
}

/// Everything the retrieval half of a request produced, before any answer.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub partitions: Vec<PartitionId>,
    pub decomposition: Option<ProductDecomposition>,
    pub fan_out: FanOutResult,
    pub merged: Vec<MergedResult>,
    pub citations: Vec<Citation>,
    /// Citation number of each merged hit
    #[serde(skip)]
    pub source_index: Vec<usize>,
    pub verdict: SufficiencyVerdict,
    #[serde(rename = "search_elapsed_ms", with = "millis")]
    pub search_elapsed: Duration,
}

impl SearchReport {
    /// Distinct partitions among the merged hits, first occurrence first.
    pub fn contributing_partitions(&self) -> Vec<PartitionId> {
        let mut seen: Vec<PartitionId> = Vec::new();
        for result in &self.merged {
            if !seen.contains(result.partition()) {
                seen.push(result.partition().clone());
            }
        }
        seen
    }
}

pub struct Orchestrator {
    registry: Arc<PartitionRegistry>,
    fan_out: FanOutExecutor,
    ranker: MergeRanker,
    gate: SufficiencyGate,
    citations: CitationResolver,
    assembler: Arc<dyn AnswerAssembler>,
    decomposer: Option<Arc<dyn DecompositionService>>,
    cache: Option<Arc<DecompositionCache>>,
    reasoner: Option<Arc<dyn SequentialReasoner>>,
}

impl Orchestrator {
    pub fn new(
        config: &RetrievalConfig,
        registry: Arc<PartitionRegistry>,
        search: Arc<dyn PartitionSearchClient>,
        assembler: Arc<dyn AnswerAssembler>,
    ) -> Self {
        let transformer = QueryTransformer::new(Arc::clone(&registry));
        Self {
            fan_out: FanOutExecutor::new(search, transformer, config),
            ranker: MergeRanker::new(Arc::clone(&registry), config),
            gate: SufficiencyGate::new(config.gate.clone()),
            citations: CitationResolver::new(Arc::clone(&registry)),
            registry,
            assembler,
            decomposer: None,
            cache: None,
            reasoner: None,
        }
    }

    /// Product names are decomposed through `service`, with `cache` in front.
    pub fn with_decomposer(
        mut self,
        service: Arc<dyn DecompositionService>,
        cache: Option<Arc<DecompositionCache>>,
    ) -> Self {
        self.decomposer = Some(service);
        self.cache = cache;
        self
    }

    pub fn with_reasoner(mut self, reasoner: Arc<dyn SequentialReasoner>) -> Self {
        self.reasoner = Some(reasoner);
        self
    }

    pub fn registry(&self) -> &PartitionRegistry {
        &self.registry
    }

    /// Run the retrieval half only: no reasoning, no answer assembly.
    ///
    /// Fails only when the search backend is unreachable.
    pub async fn retrieve(&self, request: &AnswerRequest) -> AppResult<SearchReport> {
        let decomposition = self.resolve_decomposition(request).await;
        let partitions = self.registry.select(&request.partitions);

        // search latency excludes decomposition
        let started = Instant::now();
        let fan_out = self
            .fan_out
            .search(&request.query, &partitions, decomposition.as_ref())
            .await?;
        for degraded in fan_out.degraded() {
            tracing::debug!(partition = %degraded.partition, "Partition contributed no evidence");
        }

        let merged = self.ranker.merge_and_rank(&fan_out.results);
        let verdict = self.gate.evaluate(&merged, decomposition.as_ref());
        let resolved = self.citations.resolve_indexed(&merged);

        Ok(SearchReport {
            query: request.query.clone(),
            partitions,
            decomposition,
            fan_out,
            merged,
            citations: resolved.citations,
            source_index: resolved.source_index,
            verdict,
            search_elapsed: started.elapsed(),
        })
    }

    /// Answer a question.
    ///
    /// Returns `Err` only for catastrophic failures. Every other failure is
    /// absorbed into a degraded path or the fixed fallback notice.
    pub async fn answer(&self, request: AnswerRequest) -> AppResult<OrchestratorResponse> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("answer", %request_id);
        self.answer_inner(request).instrument(span).await
    }

    async fn answer_inner(&self, request: AnswerRequest) -> AppResult<OrchestratorResponse> {
        let started = Instant::now();
        tracing::info!(query = %request.query, product = ?request.product_name, "Answering");

        let report = match self.retrieve(&request).await {
            Ok(report) => report,
            Err(e) if e.is_catastrophic() => {
                tracing::error!("Search backend unavailable: {}", e);
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("Retrieval failed, returning fallback notice: {}", e);
                return Ok(OrchestratorResponse::fallback(None, Duration::ZERO, started));
            }
        };

        let mut assembly = AssemblyRequest {
            query: request.query.clone(),
            product_name: request.product_name.clone(),
            evidence: format_context(&report.merged, &report.source_index, &report.citations),
            citations: report.citations.clone(),
            transcript: None,
            reduced_depth: false,
        };

        let path = if report.verdict.sufficient {
            AnswerPath::Direct
        } else {
            match self.reason(&request.query, &report).await {
                Ok(transcript) => {
                    assembly.transcript = Some(transcript);
                    AnswerPath::Augmented
                }
                Err(e) => {
                    tracing::warn!("Augmented pass unavailable, answering with reduced depth: {}", e);
                    assembly.reduced_depth = true;
                    AnswerPath::ReducedDepth
                }
            }
        };
        tracing::info!(path = %path, citations = report.citations.len(), "Answer path");

        let content = match self.assembler.assemble(&assembly).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Answer assembly failed, returning fallback notice: {}", e);
                return Ok(OrchestratorResponse::fallback(
                    Some(report.verdict),
                    report.search_elapsed,
                    started,
                ));
            }
        };

        let extracted = extract_references(&content);
        let partitions = report.contributing_partitions();

        Ok(OrchestratorResponse {
            content,
            citations: report.citations,
            partitions,
            references: extracted.references,
            keywords: extracted.keywords,
            path,
            verdict: Some(report.verdict),
            search_elapsed: report.search_elapsed,
            total_elapsed: started.elapsed(),
            answered_at: Utc::now(),
        })
    }

    /// Run the sequential reasoner once over the already merged evidence.
    async fn reason(&self, query: &str, report: &SearchReport) -> AppResult<String> {
        let reasoner = self
            .reasoner
            .as_ref()
            .ok_or_else(|| AppError::Retrieval("No sequential reasoner configured".to_string()))?;

        let summary = already_retrieved(&report.merged, &report.source_index, &report.citations);
        let transcript = reasoner.run(query, &summary).await?;
        if transcript.trim().is_empty() {
            return Err(AppError::Retrieval(
                "Sequential reasoner returned an empty transcript".to_string(),
            ));
        }
        Ok(transcript)
    }

    /// Request value first, then the cache, then the decomposition service.
    ///
    /// A failed or empty decomposition means generic queries, never an error.
    async fn resolve_decomposition(&self, request: &AnswerRequest) -> Option<ProductDecomposition> {
        if let Some(ref decomposition) = request.decomposition {
            return Some(decomposition.clone());
        }

        let product = request
            .product_name
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())?;

        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(product)) {
            tracing::debug!("Decomposition cache hit for '{}'", product);
            return Some(hit);
        }

        let decomposer = self.decomposer.as_ref()?;
        match decomposer.decompose(product).await {
            Ok(decomposition) if decomposition.is_empty() => {
                tracing::warn!("Decomposition of '{}' was empty, using generic queries", product);
                None
            }
            Ok(decomposition) => {
                if let Some(ref cache) = self.cache {
                    cache.insert(product, decomposition.clone());
                }
                Some(decomposition)
            }
            Err(e) => {
                tracing::warn!("Decomposition of '{}' failed, using generic queries: {}", product, e);
                None
            }
        }
    }
}
