//! Boundary to the similarity search backend.

use crate::types::{PartitionId, SearchHit};
use async_trait::async_trait;
use regscout_core::AppResult;

/// Runs one similarity query against one partition.
///
/// Called from many fan-out tasks at once, so implementations must be
/// shareable across threads. Retries, if any, happen in here; the
/// orchestrator never retries a failed partition.
#[async_trait]
pub trait PartitionSearchClient: Send + Sync {
    /// Return at most `limit` hits, most relevant first.
    async fn search(
        &self,
        partition: &PartitionId,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<SearchHit>>;

    /// Check that the backend's connection layer answers at all.
    ///
    /// An `AppError::SearchUnavailable` from here aborts the request; any
    /// partial result is impossible without the backend.
    async fn ensure_reachable(&self) -> AppResult<()> {
        Ok(())
    }
}
