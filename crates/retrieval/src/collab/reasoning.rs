//! Bounded search-and-think loop for the augmented path.
//!
//! Each step asks the model for one action: search a partition or finish.
//! Searches run one at a time through the same partition client the fan-out
//! uses, and every observation is appended to the transcript.

use super::SequentialReasoner;
use crate::qdrant::truncate_chars;
use crate::registry::PartitionRegistry;
use crate::search_client::PartitionSearchClient;
use crate::types::{PartitionId, SearchHit};
use async_trait::async_trait;
use regscout_core::AppResult;
use regscout_llm::{LlmClient, LlmRequest};
use regscout_prompt::{build_prompt, PromptDefinition};
use serde_json::json;
use std::fmt::Write;
use std::sync::Arc;

pub const DEFAULT_MAX_STEPS: usize = 4;
const SEARCH_LIMIT: usize = 3;
const OBSERVATION_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Search { partition: String, query: String },
    Final(String),
}

pub struct LlmReasoner {
    llm: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    search: Arc<dyn PartitionSearchClient>,
    registry: Arc<PartitionRegistry>,
    max_steps: usize,
}

impl LlmReasoner {
    /// `prompt` is normally the `reasoning.step` definition.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompt: PromptDefinition,
        search: Arc<dyn PartitionSearchClient>,
        registry: Arc<PartitionRegistry>,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            prompt,
            search,
            registry,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    async fn next_action(
        &self,
        query: &str,
        prior: &str,
        transcript: &str,
        step: usize,
    ) -> AppResult<Action> {
        let partitions: Vec<_> = self
            .registry
            .iter()
            .map(|p| json!({ "id": p.id.as_str(), "role": p.role }))
            .collect();

        let built = build_prompt(
            &self.prompt,
            &json!({
                "question": query,
                "priorEvidence": prior,
                "transcript": transcript,
                "partitions": partitions,
                "step": step,
                "maxSteps": self.max_steps,
            }),
        )?;

        let mut request = LlmRequest::new(built.user, &self.model)
            .with_temperature(built.sampling.temperature.unwrap_or(0.0));
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = built.sampling.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.llm.complete(&request).await?;
        Ok(parse_action(&response.content))
    }

    async fn observe(&self, partition: &str, query: &str) -> String {
        if !self.registry.contains(partition) {
            return format!("unknown partition '{}'; nothing searched", partition);
        }

        match self
            .search
            .search(&PartitionId::new(partition), query, SEARCH_LIMIT)
            .await
        {
            Ok(hits) if hits.is_empty() => "no results".to_string(),
            Ok(hits) => describe_hits(&hits),
            Err(e) => {
                tracing::warn!("Reasoning search on '{}' failed: {}", partition, e);
                format!("search failed: {}", e)
            }
        }
    }
}

#[async_trait]
impl SequentialReasoner for LlmReasoner {
    async fn run(&self, query: &str, prior_evidence_summary: &str) -> AppResult<String> {
        let mut transcript = String::new();

        for step in 1..=self.max_steps {
            match self
                .next_action(query, prior_evidence_summary, &transcript, step)
                .await?
            {
                Action::Search { partition, query: search_query } => {
                    tracing::info!(step, partition = %partition, query = %search_query, "Reasoning search");
                    let observation = self.observe(&partition, &search_query).await;
                    let _ = writeln!(
                        transcript,
                        "Step {}: SEARCH {}: {}\nObservation: {}\n",
                        step, partition, search_query, observation
                    );
                }
                Action::Final(notes) => {
                    tracing::info!(step, "Reasoning finished");
                    let _ = writeln!(transcript, "FINAL: {}", notes);
                    break;
                }
            }
        }

        Ok(transcript.trim_end().to_string())
    }
}

/// Read the first actionable line of a model reply.
///
/// Anything that is neither a well-formed `SEARCH` nor a `FINAL` line is
/// taken as final notes.
fn parse_action(reply: &str) -> Action {
    let lines: Vec<&str> = reply.lines().map(str::trim).collect();

    for (i, line) in lines.iter().enumerate() {
        let upper = line.to_ascii_uppercase();
        if let Some(rest) = upper.strip_prefix("SEARCH").map(|_| &line["SEARCH".len()..]) {
            if let Some((partition, query)) = rest.split_once(':') {
                let partition = partition
                    .trim()
                    .trim_matches(|c: char| c == '<' || c == '>' || c == '[' || c == ']')
                    .to_lowercase();
                let query = query.trim();
                if !partition.is_empty() && !query.is_empty() {
                    return Action::Search {
                        partition,
                        query: query.to_string(),
                    };
                }
            }
        } else if upper.starts_with("FINAL") {
            let first = line["FINAL".len()..].trim_start_matches(':').trim();
            let rest = lines[i + 1..].join("\n");
            let notes = format!("{}\n{}", first, rest);
            return Action::Final(notes.trim().to_string());
        }
    }

    Action::Final(reply.trim().to_string())
}

fn describe_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| {
            format!(
                "\n- {} (score {:.2}): {}",
                h.title.as_deref().unwrap_or("Untitled"),
                h.score,
                truncate_chars(h.text.trim(), OBSERVATION_CHARS)
            )
        })
        .collect()
}
