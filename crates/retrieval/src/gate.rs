//! Sufficiency gate: is the merged evidence enough to answer directly?

use crate::types::{MergedResult, PartitionId, ProductDecomposition};
use regscout_core::config::GateConfig;
use serde::Serialize;
use std::fmt;

/// The gate's checks, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCheck {
    ResultCount,
    AverageScore,
    PartitionDiversity,
    EssentialPartition,
}

impl fmt::Display for GateCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ResultCount => "result count",
            Self::AverageScore => "average score",
            Self::PartitionDiversity => "partition diversity",
            Self::EssentialPartition => "essential partition",
        };
        f.write_str(name)
    }
}

/// Decision plus the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SufficiencyVerdict {
    pub sufficient: bool,
    /// First check that failed; `None` when sufficient
    pub failed_check: Option<GateCheck>,
    pub result_count: usize,
    pub average_score: f32,
    pub distinct_partitions: usize,
    /// Essential partitions that contributed at least one result
    pub essential_present: Vec<PartitionId>,
    /// Whether the request carried a product decomposition
    pub product_mode: bool,
}

/// Stateless classifier over a merged result list.
#[derive(Debug, Clone)]
pub struct SufficiencyGate {
    config: GateConfig,
}

impl SufficiencyGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn is_sufficient(
        &self,
        merged: &[MergedResult],
        decomposition: Option<&ProductDecomposition>,
    ) -> bool {
        self.evaluate(merged, decomposition).sufficient
    }

    /// Run the checks in order and stop at the first failure.
    pub fn evaluate(
        &self,
        merged: &[MergedResult],
        decomposition: Option<&ProductDecomposition>,
    ) -> SufficiencyVerdict {
        let result_count = merged.len();
        let average_score = if merged.is_empty() {
            0.0
        } else {
            merged.iter().map(|m| m.score()).sum::<f32>() / result_count as f32
        };

        let mut partitions: Vec<&PartitionId> = Vec::new();
        for m in merged {
            if !partitions.contains(&m.partition()) {
                partitions.push(m.partition());
            }
        }

        let essential_present: Vec<PartitionId> = partitions
            .iter()
            .filter(|p| self.config.essential_partitions.iter().any(|e| e == p.as_str()))
            .map(|p| (*p).clone())
            .collect();

        let checks = [
            (
                GateCheck::ResultCount,
                result_count >= self.config.min_results,
            ),
            (
                GateCheck::AverageScore,
                average_score >= self.config.min_average_score,
            ),
            (
                GateCheck::PartitionDiversity,
                partitions.len() >= self.config.min_distinct_partitions,
            ),
            (GateCheck::EssentialPartition, !essential_present.is_empty()),
        ];
        let failed_check = checks.iter().find(|(_, passed)| !passed).map(|(c, _)| *c);

        let verdict = SufficiencyVerdict {
            sufficient: failed_check.is_none(),
            failed_check,
            result_count,
            average_score,
            distinct_partitions: partitions.len(),
            essential_present,
            product_mode: decomposition.is_some(),
        };

        match verdict.failed_check {
            None => tracing::info!(
                "Evidence sufficient: {} results, avg score {:.3}, {} partitions",
                verdict.result_count,
                verdict.average_score,
                verdict.distinct_partitions
            ),
            Some(check) => tracing::info!(
                "Evidence insufficient: {} check failed ({} results, avg score {:.3}, {} partitions, essential {:?})",
                check,
                verdict.result_count,
                verdict.average_score,
                verdict.distinct_partitions,
                verdict
                    .essential_present
                    .iter()
                    .map(PartitionId::as_str)
                    .collect::<Vec<_>>()
            ),
        }

        verdict
    }
}
