//! Static partition registry.
//!
//! Loaded once at startup, either from the built-in table or from the
//! `partitions` section of the config file, and never mutated afterwards.

use crate::types::{MergedResult, PartitionId};
use regscout_core::config::{AppConfig, PartitionConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coarse grouping of partitions by the kind of evidence they hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionGroup {
    Regulations,
    Guidance,
    Safety,
    Verification,
    Other,
}

impl PartitionGroup {
    /// Group of a known partition id; anything else is `Other`.
    pub fn for_partition(id: &str) -> Self {
        match id {
            "ecfr" | "usc" => Self::Regulations,
            "guidance" | "rpm" => Self::Guidance,
            "gras" | "dwpe" => Self::Safety,
            "fsvp" => Self::Verification,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regulations => "regulations",
            Self::Guidance => "guidance",
            Self::Safety => "safety",
            Self::Verification => "verification",
            Self::Other => "other",
        }
    }
}

/// Registry entry for one partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub id: PartitionId,
    /// Human-readable role, e.g. "Import Alert database"
    pub role: String,
    /// Short label prefixed to generic queries
    pub label: String,
    pub description: String,
    /// Keyword shape the partition responds to best
    pub search_pattern: String,
    /// Reference URL used when a hit carries none
    pub fallback_url: Option<String>,
    pub group: PartitionGroup,
}

struct BuiltinPartition {
    id: &'static str,
    role: &'static str,
    label: &'static str,
    description: &'static str,
    search_pattern: &'static str,
    fallback_url: &'static str,
}

const BUILTIN_PARTITIONS: &[BuiltinPartition] = &[
    BuiltinPartition {
        id: "dwpe",
        role: "Import Alert database",
        label: "Import Alert",
        description: "FDA Import Alerts, detention without physical examination, red list companies",
        search_pattern: "[origin] [product_type] Import Alert detention red list",
        fallback_url: "https://www.accessdata.fda.gov/cms_ia/ialist.html",
    },
    BuiltinPartition {
        id: "ecfr",
        role: "Electronic Code of Federal Regulations",
        label: "21 CFR",
        description: "21 CFR regulations: specific requirements, tolerances, specifications",
        search_pattern: "21 CFR [part_number] [substance] [process] requirements",
        fallback_url: "https://www.ecfr.gov/current/title-21",
    },
    BuiltinPartition {
        id: "fsvp",
        role: "Foreign Supplier Verification Program",
        label: "FSVP",
        description: "Importer responsibilities, supplier verification, hazard analysis",
        search_pattern: "foreign supplier [risk_level] verification [product_category]",
        fallback_url: "https://www.ecfr.gov/current/title-21/chapter-I/subchapter-A/part-1/subpart-L",
    },
    BuiltinPartition {
        id: "gras",
        role: "Generally Recognized As Safe notices",
        label: "GRAS",
        description: "GRAS Notice inventory: substance, intended use, notifier, status, filing year",
        search_pattern: "[substance] GRAS [intended_use] [status] [year]",
        fallback_url: "https://www.fda.gov/food/generally-recognized-safe-gras/gras-notice-inventory",
    },
    BuiltinPartition {
        id: "guidance",
        role: "FDA guidance documents",
        label: "Guidance",
        description: "Compliance policy guides, labeling guides, allergen guidance, additives policy",
        search_pattern: "[category] [topic] compliance policy guidance",
        fallback_url: "https://www.fda.gov/regulatory-information/search-fda-guidance-documents",
    },
    BuiltinPartition {
        id: "rpm",
        role: "Regulatory Procedures Manual",
        label: "RPM",
        description: "Import procedures, detention, personal use, mail shipments",
        search_pattern: "[import_type] shipment detention personal use procedures",
        fallback_url: "https://www.fda.gov/inspections-compliance-enforcement-and-criminal-investigations/compliance-manuals/regulatory-procedures-manual",
    },
    BuiltinPartition {
        id: "usc",
        role: "United States Code, Title 21",
        label: "21 U.S.C.",
        description: "21 USC: legal definitions, prohibited acts, misbranding and adulteration",
        search_pattern: "21 USC 343 [topic] misbranding adulteration",
        fallback_url: "https://uscode.house.gov/browse/prelim@title21/chapter9",
    },
];

/// Immutable registry of the partitions the orchestrator knows about.
#[derive(Debug, Clone)]
pub struct PartitionRegistry {
    partitions: Vec<PartitionSpec>,
}

impl PartitionRegistry {
    /// The seven built-in FDA partitions.
    pub fn builtin() -> Self {
        let partitions = BUILTIN_PARTITIONS
            .iter()
            .map(|p| PartitionSpec {
                id: PartitionId::new(p.id),
                role: p.role.to_string(),
                label: p.label.to_string(),
                description: p.description.to_string(),
                search_pattern: p.search_pattern.to_string(),
                fallback_url: Some(p.fallback_url.to_string()),
                group: PartitionGroup::for_partition(p.id),
            })
            .collect();

        Self { partitions }
    }

    /// Registry from a config override. Duplicate ids keep the first entry.
    pub fn from_config(entries: &[PartitionConfig]) -> Self {
        let mut partitions: Vec<PartitionSpec> = Vec::with_capacity(entries.len());

        for entry in entries {
            if partitions.iter().any(|p| p.id.as_str() == entry.id) {
                tracing::warn!("Duplicate partition '{}' in config ignored", entry.id);
                continue;
            }
            partitions.push(PartitionSpec {
                id: PartitionId::new(entry.id.clone()),
                role: entry.role.clone(),
                label: entry.label.clone(),
                description: entry.description.clone(),
                search_pattern: entry.search_pattern.trim().to_string(),
                fallback_url: entry.fallback_url.clone().filter(|u| !u.trim().is_empty()),
                group: PartitionGroup::for_partition(&entry.id),
            });
        }

        Self { partitions }
    }

    /// Registry for a resolved application config.
    pub fn from_app_config(config: &AppConfig) -> Self {
        match config.partitions {
            Some(ref entries) => Self::from_config(entries),
            None => Self::builtin(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&PartitionSpec> {
        self.partitions.iter().find(|p| p.id.as_str() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartitionSpec> {
        self.partitions.iter()
    }

    pub fn ids(&self) -> Vec<PartitionId> {
        self.partitions.iter().map(|p| p.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn fallback_url(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(|p| p.fallback_url.as_deref())
    }

    /// Partitions to query for a request.
    ///
    /// An empty selection means every registered partition. Unregistered ids
    /// are kept (the backend may still serve them) but logged.
    pub fn select(&self, requested: &[String]) -> Vec<PartitionId> {
        if requested.is_empty() {
            return self.ids();
        }

        let mut selected: Vec<PartitionId> = Vec::with_capacity(requested.len());
        for id in requested {
            let id = id.trim();
            if id.is_empty() || selected.iter().any(|p| p.as_str() == id) {
                continue;
            }
            if !self.contains(id) {
                tracing::warn!("Partition '{}' is not registered; querying it anyway", id);
            }
            selected.push(PartitionId::new(id));
        }
        selected
    }
}

/// Bucket merged results by partition group, best score first within each.
///
/// Only groups with at least one result are present.
pub fn group_results(results: &[MergedResult]) -> BTreeMap<PartitionGroup, Vec<MergedResult>> {
    let mut grouped: BTreeMap<PartitionGroup, Vec<MergedResult>> = BTreeMap::new();

    for result in results {
        grouped
            .entry(PartitionGroup::for_partition(result.partition().as_str()))
            .or_default()
            .push(result.clone());
    }

    for bucket in grouped.values_mut() {
        bucket.sort_by(|a, b| b.score().total_cmp(&a.score()));
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SearchHit;

    fn merged(partition: &str, score: f32) -> MergedResult {
        MergedResult {
            hit: SearchHit::new(partition, score, "text"),
            role: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_builtin_registry() {
        let registry = PartitionRegistry::builtin();
        assert_eq!(registry.len(), 7);
        for id in ["dwpe", "ecfr", "fsvp", "gras", "guidance", "rpm", "usc"] {
            let spec = registry.get(id).unwrap();
            assert!(spec.fallback_url.is_some(), "{} has no fallback url", id);
            assert!(!spec.label.is_empty());
            assert!(!spec.search_pattern.is_empty(), "{} has no search pattern", id);
        }
        assert_eq!(registry.get("fsvp").unwrap().group, PartitionGroup::Verification);
    }

    #[test]
    fn test_from_config_skips_duplicates() {
        let entries = vec![
            PartitionConfig {
                id: "alerts".to_string(),
                role: "Alerts".to_string(),
                label: "Alert".to_string(),
                description: String::new(),
                search_pattern: " [substance] alert ".to_string(),
                fallback_url: Some("  ".to_string()),
            },
            PartitionConfig {
                id: "alerts".to_string(),
                role: "Other".to_string(),
                label: "Other".to_string(),
                description: String::new(),
                search_pattern: String::new(),
                fallback_url: None,
            },
        ];
        let registry = PartitionRegistry::from_config(&entries);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("alerts").unwrap().role, "Alerts");
        assert_eq!(registry.fallback_url("alerts"), None);
        assert_eq!(registry.get("alerts").unwrap().group, PartitionGroup::Other);
        assert_eq!(registry.get("alerts").unwrap().search_pattern, "[substance] alert");
    }

    #[test]
    fn test_select_defaults_to_all() {
        let registry = PartitionRegistry::builtin();
        assert_eq!(registry.select(&[]).len(), 7);
    }

    #[test]
    fn test_select_dedups_and_keeps_unknown() {
        let registry = PartitionRegistry::builtin();
        let selected = registry.select(&[
            "ecfr".to_string(),
            "ecfr".to_string(),
            "custom".to_string(),
            " ".to_string(),
        ]);
        assert_eq!(selected, vec![PartitionId::from("ecfr"), PartitionId::from("custom")]);
    }

    #[test]
    fn test_group_results() {
        let results = vec![
            merged("ecfr", 0.7),
            merged("usc", 0.9),
            merged("gras", 0.8),
            merged("custom", 0.65),
        ];
        let grouped = group_results(&results);

        let regulations = &grouped[&PartitionGroup::Regulations];
        assert_eq!(regulations.len(), 2);
        assert_eq!(regulations[0].partition().as_str(), "usc");
        assert_eq!(grouped[&PartitionGroup::Safety].len(), 1);
        assert_eq!(grouped[&PartitionGroup::Other].len(), 1);
        assert!(!grouped.contains_key(&PartitionGroup::Verification));
    }
}
