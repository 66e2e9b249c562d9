//! Citation numbering, fallback titles/URLs and de-duplication.

use crate::registry::PartitionRegistry;
use crate::types::{Citation, MergedResult};
use std::collections::HashSet;
use std::sync::Arc;

/// Citations plus, for every merged hit, the citation number it maps to.
///
/// Duplicates share the number of their first occurrence, so evidence text
/// for both can still be labelled consistently.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCitations {
    pub citations: Vec<Citation>,
    pub source_index: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct CitationResolver {
    registry: Arc<PartitionRegistry>,
}

impl CitationResolver {
    pub fn new(registry: Arc<PartitionRegistry>) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, merged: &[MergedResult]) -> Vec<Citation> {
        self.resolve_indexed(merged).citations
    }

    /// Number citations 1.. in merged order, dropping later (title, url)
    /// duplicates.
    pub fn resolve_indexed(&self, merged: &[MergedResult]) -> ResolvedCitations {
        let mut citations: Vec<Citation> = Vec::with_capacity(merged.len());
        let mut seen: HashSet<(String, Option<String>)> = HashSet::new();
        let mut source_index = Vec::with_capacity(merged.len());

        for result in merged {
            let index = citations.len() + 1;
            let partition = result.partition();

            let title = match result.hit.title.as_deref().map(str::trim) {
                Some(title) if !title.is_empty() => title.to_string(),
                _ => format!("{} Document {}", partition.as_str().to_uppercase(), index),
            };
            let url = match result.hit.url.as_deref().map(str::trim) {
                Some(url) if !url.is_empty() => Some(url.to_string()),
                _ => self.registry.fallback_url(partition.as_str()).map(str::to_string),
            };

            let key = (title, url);
            if seen.contains(&key) {
                let existing = citations
                    .iter()
                    .find(|c| c.title == key.0 && c.url == key.1)
                    .map(|c| c.index)
                    .unwrap_or(index);
                tracing::debug!("Duplicate citation '{}' folded into [{}]", key.0, existing);
                source_index.push(existing);
                continue;
            }
            seen.insert(key.clone());

            let (title, url) = key;
            citations.push(Citation {
                index,
                partition: partition.clone(),
                title,
                url,
                score: result.score(),
            });
            source_index.push(index);
        }

        ResolvedCitations {
            citations,
            source_index,
        }
    }
}
