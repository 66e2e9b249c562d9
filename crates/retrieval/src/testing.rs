//! In-memory collaborators for unit and scenario tests.

use crate::collab::{AnswerAssembler, AssemblyRequest, DecompositionService, SequentialReasoner};
use crate::search_client::PartitionSearchClient;
use crate::types::{PartitionId, ProductDecomposition, SearchHit};
use async_trait::async_trait;
use regscout_core::{AppError, AppResult};
use regscout_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Script {
    Hits(Vec<SearchHit>),
    Fail(String),
    Delay(Duration, Vec<SearchHit>),
}

/// Scripted search backend: hits, failures and delays per partition.
///
/// Partitions without a script return no hits.
#[derive(Debug, Default)]
pub struct StaticSearchClient {
    scripts: HashMap<String, Script>,
    unreachable: bool,
    calls: Mutex<Vec<(String, String, usize)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StaticSearchClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(mut self, partition: &str, scores: &[f32]) -> Self {
        self.scripts
            .insert(partition.to_string(), Script::Hits(scored_hits(partition, scores)));
        self
    }

    pub fn with_raw_hits(mut self, partition: &str, hits: Vec<SearchHit>) -> Self {
        self.scripts.insert(partition.to_string(), Script::Hits(hits));
        self
    }

    pub fn with_failure(mut self, partition: &str, message: &str) -> Self {
        self.scripts
            .insert(partition.to_string(), Script::Fail(message.to_string()));
        self
    }

    pub fn with_delay(mut self, partition: &str, delay: Duration, scores: &[f32]) -> Self {
        self.scripts.insert(
            partition.to_string(),
            Script::Delay(delay, scored_hits(partition, scores)),
        );
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// `(partition, query, limit)` of every search call, in call order.
    pub fn calls(&self) -> Vec<(String, String, usize)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Titled hits with distinct URLs, one per score, in the given order.
pub fn scored_hits(partition: &str, scores: &[f32]) -> Vec<SearchHit> {
    scores
        .iter()
        .enumerate()
        .map(|(i, score)| {
            SearchHit::new(partition, *score, format!("{} passage {}", partition, i + 1))
                .with_title(format!("{} doc {}", partition, i + 1))
                .with_url(format!("https://example.test/{}/{}", partition, i + 1))
        })
        .collect()
}

#[async_trait]
impl PartitionSearchClient for StaticSearchClient {
    async fn search(
        &self,
        partition: &PartitionId,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<SearchHit>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((partition.to_string(), query.to_string(), limit));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = match self.scripts.get(partition.as_str()) {
            None => Ok(Vec::new()),
            Some(Script::Hits(hits)) => {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(hits.iter().take(limit).cloned().collect())
            }
            Some(Script::Fail(message)) => Err(AppError::Search(message.clone())),
            Some(Script::Delay(delay, hits)) => {
                tokio::time::sleep(*delay).await;
                Ok(hits.iter().take(limit).cloned().collect())
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn ensure_reachable(&self) -> AppResult<()> {
        if self.unreachable {
            Err(AppError::SearchUnavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

/// LLM double that replays canned replies and records every request.
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<AppResult<String>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<AppResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or_else(|| Err(AppError::Llm("no scripted reply left".to_string())))?;

        Ok(LlmResponse {
            content: reply,
            model: request.model.clone(),
            usage: LlmUsage::new(10, 10),
        })
    }
}

/// Decomposer double returning a fixed result and counting calls.
#[derive(Debug)]
pub struct StaticDecomposer {
    result: Option<ProductDecomposition>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StaticDecomposer {
    pub fn returning(decomposition: ProductDecomposition) -> Self {
        Self {
            result: Some(decomposition),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecompositionService for StaticDecomposer {
    async fn decompose(&self, product_name: &str) -> AppResult<ProductDecomposition> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result
            .clone()
            .ok_or_else(|| AppError::Retrieval(format!("cannot decompose '{}'", product_name)))
    }
}

/// Reasoner double with a fixed outcome; records each prior-evidence summary.
#[derive(Debug)]
pub struct ScriptedReasoner {
    transcript: Option<String>,
    summaries: Mutex<Vec<String>>,
}

impl ScriptedReasoner {
    pub fn returning(transcript: &str) -> Self {
        Self {
            transcript: Some(transcript.to_string()),
            summaries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            transcript: None,
            summaries: Mutex::new(Vec::new()),
        }
    }

    pub fn summaries(&self) -> Vec<String> {
        self.summaries.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SequentialReasoner for ScriptedReasoner {
    async fn run(&self, _query: &str, prior_evidence_summary: &str) -> AppResult<String> {
        if let Ok(mut summaries) = self.summaries.lock() {
            summaries.push(prior_evidence_summary.to_string());
        }
        self.transcript
            .clone()
            .ok_or_else(|| AppError::Retrieval("reasoning model offline".to_string()))
    }
}

/// Assembler double that records every request and replies with fixed text.
#[derive(Debug)]
pub struct RecordingAssembler {
    reply: Option<String>,
    requests: Mutex<Vec<AssemblyRequest>>,
}

impl RecordingAssembler {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<AssemblyRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AnswerAssembler for RecordingAssembler {
    async fn assemble(&self, request: &AssemblyRequest) -> AppResult<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.reply
            .clone()
            .ok_or_else(|| AppError::Llm("completion endpoint returned 503".to_string()))
    }
}
