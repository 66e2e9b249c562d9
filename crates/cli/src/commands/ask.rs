//! Ask command handler.
//!
//! Runs the full orchestrator: retrieval, the sufficiency gate, optional
//! sequential reasoning and answer assembly.

use super::{print_json, QueryArgs};
use clap::Args;
use regscout_core::{config::AppConfig, AppResult};
use regscout_retrieval::{build_orchestrator, AnswerPath, OrchestratorResponse};

/// Answer a food-import question from the regulatory partitions
#[derive(Args, Debug)]
pub struct AskCommand {
    #[command(flatten)]
    pub query: QueryArgs,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let request = self.query.to_request()?;
        tracing::debug!("Ask request: {:?}", request);

        let orchestrator = build_orchestrator(config)?;
        let response = orchestrator.answer(request).await?;

        if self.query.json {
            print_json(&response)
        } else {
            print_answer(&response);
            Ok(())
        }
    }
}

fn print_answer(response: &OrchestratorResponse) {
    println!("{}", response.content);

    if response.path == AnswerPath::Fallback {
        return;
    }

    if !response.citations.is_empty() {
        println!("\nSources:");
        for citation in &response.citations {
            match citation.url {
                Some(ref url) => println!("  [{}] {} - {}", citation.index, citation.title, url),
                None => println!("  [{}] {}", citation.index, citation.title),
            }
        }
    }

    if !response.references.is_empty() {
        println!("\nReferences:");
        for reference in &response.references {
            println!("  {} - {}", reference.title, reference.url);
        }
    }

    tracing::info!(
        path = %response.path,
        search_ms = response.search_elapsed.as_millis() as u64,
        total_ms = response.total_elapsed.as_millis() as u64,
        "Answered from {} partitions",
        response.partitions.len()
    );
}
