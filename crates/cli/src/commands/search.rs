//! Search command handler.
//!
//! Runs fan-out, merge and the sufficiency gate without asking the LLM for an
//! answer, then prints what was found.

use super::{print_json, QueryArgs};
use clap::Args;
use regscout_core::{config::AppConfig, AppResult};
use regscout_retrieval::{
    build_orchestrator, group_results, top_n, CallOutcome, SearchReport,
};

/// Search the partitions and show merged evidence, citations and the verdict
#[derive(Args, Debug)]
pub struct SearchCommand {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Number of merged hits to show (default: retrieval.displayTopN)
    #[arg(short = 'n', long)]
    pub top: Option<usize>,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let request = self.query.to_request()?;

        let orchestrator = build_orchestrator(config)?;
        let report = orchestrator.retrieve(&request).await?;

        if self.query.json {
            return print_json(&report);
        }

        let top = self.top.unwrap_or(config.retrieval.display_top_n);
        print_report(&report, top);
        Ok(())
    }
}

fn print_report(report: &SearchReport, top: usize) {
    if let Some(ref decomposition) = report.decomposition {
        println!(
            "Product: category={}, origin={}, ingredients=[{}]",
            decomposition.category,
            decomposition.origin,
            decomposition.ingredients.join(", ")
        );
    }

    println!("Partitions:");
    for result in &report.fan_out.results {
        let status = match result.outcome {
            CallOutcome::Ok => format!("{} hits", result.hits.len()),
            CallOutcome::Failed(ref reason) => format!("failed: {}", reason),
            CallOutcome::TimedOut => "timed out".to_string(),
        };
        println!("  {:<10} {:<16} {}", result.partition, status, result.query);
    }

    let shown = top_n(&report.merged, top);
    println!("\nTop {} of {} merged results:", shown.len(), report.merged.len());
    for (group, results) in group_results(shown) {
        println!("  {}", group.as_str());
        for result in results {
            println!(
                "    {:.3}  [{}] {}",
                result.score(),
                result.partition(),
                result.hit.title.as_deref().unwrap_or("Untitled")
            );
        }
    }

    if !report.citations.is_empty() {
        println!("\nCitations:");
        for citation in &report.citations {
            match citation.url {
                Some(ref url) => println!("  [{}] {} - {}", citation.index, citation.title, url),
                None => println!("  [{}] {}", citation.index, citation.title),
            }
        }
    }

    let verdict = &report.verdict;
    println!(
        "\nVerdict: {} ({} results, avg {:.3}, {} partitions{})",
        if verdict.sufficient { "sufficient" } else { "insufficient" },
        verdict.result_count,
        verdict.average_score,
        verdict.distinct_partitions,
        verdict
            .failed_check
            .map(|c| format!(", failed {}", c))
            .unwrap_or_default()
    );
    println!("Search took {} ms", report.search_elapsed.as_millis());
}
