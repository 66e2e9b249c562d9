//! Score filter, per-partition quota and global ordering.

use crate::fanout::PartitionResults;
use crate::registry::PartitionRegistry;
use crate::types::MergedResult;
use regscout_core::config::RetrievalConfig;
use std::sync::Arc;

/// Consolidates per-partition results into one relevance-ordered list.
///
/// Scores are compared exactly as the backend reports them; partitions are
/// not calibrated against each other.
#[derive(Debug, Clone)]
pub struct MergeRanker {
    registry: Arc<PartitionRegistry>,
    min_score: f32,
    quota: usize,
}

impl MergeRanker {
    pub fn new(registry: Arc<PartitionRegistry>, config: &RetrievalConfig) -> Self {
        Self::with_thresholds(registry, config.min_score, config.per_partition_quota)
    }

    pub fn with_thresholds(registry: Arc<PartitionRegistry>, min_score: f32, quota: usize) -> Self {
        Self {
            registry,
            min_score,
            quota,
        }
    }

    /// Filter, apply the quota, annotate and sort.
    ///
    /// Output length is at most `results.len() * quota`, every score is
    /// `>= min_score`, and equal scores keep their per-partition order.
    pub fn merge_and_rank(&self, results: &[PartitionResults]) -> Vec<MergedResult> {
        let mut merged: Vec<MergedResult> = Vec::new();

        for partition in results {
            let spec = self.registry.get(partition.partition.as_str());

            // NaN fails the comparison and is dropped with the low scorers.
            let kept = partition
                .hits
                .iter()
                .filter(|hit| hit.score >= self.min_score)
                .take(self.quota);

            for hit in kept {
                merged.push(MergedResult {
                    hit: hit.clone(),
                    role: spec.map(|s| s.role.clone()).unwrap_or_default(),
                    description: spec.map(|s| s.description.clone()).unwrap_or_default(),
                });
            }
        }

        merged.sort_by(|a, b| b.score().total_cmp(&a.score()));

        tracing::debug!(
            "Merged {} hits from {} partitions (min score {}, quota {})",
            merged.len(),
            results.len(),
            self.min_score,
            self.quota
        );

        merged
    }
}

/// The best `n` merged results for display.
pub fn top_n(merged: &[MergedResult], n: usize) -> &[MergedResult] {
    &merged[..n.min(merged.len())]
}
