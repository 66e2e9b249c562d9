//! End-to-end tests of the orchestrator over in-memory collaborators.

mod scenarios;

use crate::collab::AnswerAssembler;
use crate::orchestrator::Orchestrator;
use crate::registry::PartitionRegistry;
use crate::testing::{RecordingAssembler, StaticSearchClient};
use regscout_core::config::RetrievalConfig;
use std::sync::Arc;

fn config() -> RetrievalConfig {
    RetrievalConfig {
        per_call_timeout_ms: 2_000,
        ..Default::default()
    }
}

fn orchestrator_with(
    config: &RetrievalConfig,
    search: Arc<StaticSearchClient>,
    assembler: Arc<RecordingAssembler>,
) -> Orchestrator {
    let assembler: Arc<dyn AnswerAssembler> = assembler;
    Orchestrator::new(
        config,
        Arc::new(PartitionRegistry::builtin()),
        search,
        assembler,
    )
}

/// Hits that pass the default gate: 5 results over 4 partitions, average 0.72.
fn sufficient_search() -> StaticSearchClient {
    StaticSearchClient::new()
        .with_hits("guidance", &[0.80, 0.74])
        .with_hits("ecfr", &[0.70])
        .with_hits("gras", &[0.68])
        .with_hits("fsvp", &[0.68])
}
