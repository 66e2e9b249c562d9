//! Per-partition query construction.
//!
//! Similarity search on these collections rewards keyword density over
//! grammar, so every template produces a short run of keywords rather than
//! a sentence.

use crate::registry::PartitionRegistry;
use crate::types::{PartitionId, ProductDecomposition};
use std::sync::Arc;

/// Query used when a generic request carries no text at all.
pub const DEFAULT_QUERY: &str = "food import export FDA requirements";

/// What a partition query is built from.
#[derive(Debug, Clone, Copy)]
pub enum QueryInput<'a> {
    /// Structured product description; each partition gets its own template
    Product(&'a ProductDecomposition),
    /// Pre-expanded question text shared by every partition
    Raw(&'a str),
}

/// Builds the search string for one partition. Pure and deterministic.
#[derive(Debug, Clone)]
pub struct QueryTransformer {
    registry: Arc<PartitionRegistry>,
}

impl QueryTransformer {
    pub fn new(registry: Arc<PartitionRegistry>) -> Self {
        Self { registry }
    }

    pub fn transform(&self, partition: &PartitionId, input: QueryInput<'_>) -> String {
        match input {
            QueryInput::Product(decomposition) => product_query(partition.as_str(), decomposition),
            QueryInput::Raw(query) => {
                let query = query.trim();
                if query.is_empty() {
                    return DEFAULT_QUERY.to_string();
                }
                match self.registry.get(partition.as_str()) {
                    Some(spec) if !spec.label.trim().is_empty() => {
                        format!("{}: {}", spec.label.trim(), query)
                    }
                    _ => query.to_string(),
                }
            }
        }
    }
}

fn product_query(partition: &str, d: &ProductDecomposition) -> String {
    let category = or_default(&d.category, "food");

    match partition {
        "dwpe" => keywords(&[
            "Import Alert",
            category,
            &from_origin(&d.origin),
            "detention without examination",
            &head(&d.ingredients, 3),
            &head(&d.hazards, 2),
        ]),
        "ecfr" => keywords(&[
            "21 CFR",
            category,
            &head(&d.processes, 2),
            &d.storage_type,
            "manufacturing requirements",
        ]),
        "fsvp" => keywords(&[
            "FSVP foreign supplier verification",
            category,
            or_default(&d.origin, "foreign"),
            &d.risk_level,
            "hazard analysis",
        ]),
        "gras" if !d.ingredients.is_empty() => keywords(&[
            "GRAS",
            &head(&d.ingredients, 3),
            "food ingredient use no objection",
        ]),
        "gras" => "GRAS food ingredients general use approved".to_string(),
        "guidance" if !d.allergens.is_empty() => keywords(&[
            "Guidance allergen labeling",
            &d.allergens.join(" "),
            category,
            "requirements",
        ]),
        "guidance" => keywords(&[
            "Guidance food labeling",
            category,
            &head(&d.packaging_concerns, 2),
            "requirements",
        ]),
        "rpm" => keywords(&[
            "RPM import procedures",
            or_default(&d.import_type, "commercial"),
            "shipments detention",
        ]),
        "usc" => keywords(&[
            "21 U.S.C.",
            category,
            "labeling misbranding adulteration requirements",
        ]),
        _ => format!("FDA requirements for {}", category),
    }
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value.trim()
    }
}

fn from_origin(origin: &str) -> String {
    match origin.trim() {
        "" => String::new(),
        origin => format!("from {}", origin),
    }
}

fn head(items: &[String], n: usize) -> String {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(n)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Join the non-empty parts with single spaces.
fn keywords(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|p| p.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}
