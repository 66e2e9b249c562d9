//! Partitions command handler.

use super::print_json;
use clap::Args;
use regscout_core::{config::AppConfig, AppResult};
use regscout_retrieval::{PartitionRegistry, PartitionSpec};
use serde_json::{json, Value};

/// List the knowledge partitions that can be searched
#[derive(Args, Debug)]
pub struct PartitionsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PartitionsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let registry = PartitionRegistry::from_app_config(config);

        if self.json {
            let entries: Vec<Value> = registry.iter().map(partition_json).collect();
            return print_json(&entries);
        }

        for partition in registry.iter() {
            for line in partition_lines(partition) {
                println!("{}", line);
            }
        }
        Ok(())
    }
}

fn partition_json(partition: &PartitionSpec) -> Value {
    json!({
        "id": partition.id,
        "role": partition.role,
        "label": partition.label,
        "group": partition.group.as_str(),
        "description": partition.description,
        "searchPattern": partition.search_pattern,
        "fallbackUrl": partition.fallback_url,
    })
}

fn partition_lines(partition: &PartitionSpec) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<10} {:<14} {}",
        partition.id,
        partition.group.as_str(),
        partition.role
    )];
    if !partition.description.is_empty() {
        lines.push(format!("           {}", partition.description));
    }
    if !partition.search_pattern.is_empty() {
        lines.push(format!("           pattern: {}", partition.search_pattern));
    }
    lines
}
