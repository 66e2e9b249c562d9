//! regscout CLI
//!
//! Answers FDA food-import questions by searching several regulatory
//! knowledge partitions at once and assembling a cited answer.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, PartitionsCommand, SearchCommand};
use regscout_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// regscout - multi-source regulatory retrieval for food exporters
#[derive(Parser, Debug)]
#[command(name = "regscout")]
#[command(about = "Multi-source regulatory retrieval for food exporters", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "REGSCOUT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "REGSCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (ollama, openai)
    #[arg(short, long, global = true, env = "REGSCOUT_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "REGSCOUT_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question with citations
    Ask(AskCommand),

    /// Search partitions and show merged evidence without an answer
    Search(SearchCommand),

    /// List searchable partitions
    Partitions(PartitionsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_with(cli.workspace.clone(), cli.config.clone())?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}, model: {}", config.provider, config.model);

    config.validate()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Search(_) => "search",
        Commands::Partitions(_) => "partitions",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Partitions(cmd) => cmd.execute(&config).await,
    };

    if let Err(ref e) = result {
        tracing::error!("Command failed: {}", e);
    }

    result
}
