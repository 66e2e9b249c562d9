//! Concurrent per-partition search.
//!
//! One task per requested partition, bounded by a semaphore. Each call gets
//! its own timeout once it holds a permit; a failed or timed-out call
//! contributes an empty result set and never cancels its siblings.
//!
//! Worst-case latency is roughly
//! `ceil(partitions / max_concurrency) * per_call_timeout` (there is no
//! aggregate deadline).

use crate::query::{QueryInput, QueryTransformer};
use crate::search_client::PartitionSearchClient;
use crate::types::{PartitionId, ProductDecomposition, SearchHit};
use futures::future::join_all;
use regscout_core::config::RetrievalConfig;
use regscout_core::AppResult;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// How a single partition call ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum CallOutcome {
    Ok,
    Failed(String),
    TimedOut,
}

/// Raw results of one partition call, in backend order.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionResults {
    pub partition: PartitionId,
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub outcome: CallOutcome,
    #[serde(with = "millis")]
    pub elapsed: Duration,
}

impl PartitionResults {
    /// Successful results, e.g. for feeding the merge-ranker directly.
    pub fn ok(partition: impl Into<PartitionId>, hits: Vec<SearchHit>) -> Self {
        Self {
            partition: partition.into(),
            query: String::new(),
            hits,
            outcome: CallOutcome::Ok,
            elapsed: Duration::ZERO,
        }
    }
}

/// Output of one fan-out, in the order partitions were requested.
#[derive(Debug, Clone, Serialize)]
pub struct FanOutResult {
    pub results: Vec<PartitionResults>,
    #[serde(with = "millis")]
    pub elapsed: Duration,
}

impl FanOutResult {
    pub fn get(&self, partition: &str) -> Option<&PartitionResults> {
        self.results.iter().find(|r| r.partition.as_str() == partition)
    }

    pub fn total_hits(&self) -> usize {
        self.results.iter().map(|r| r.hits.len()).sum()
    }

    /// Partitions whose call failed or timed out.
    pub fn degraded(&self) -> impl Iterator<Item = &PartitionResults> {
        self.results.iter().filter(|r| r.outcome != CallOutcome::Ok)
    }
}

pub struct FanOutExecutor {
    client: Arc<dyn PartitionSearchClient>,
    transformer: QueryTransformer,
    semaphore: Arc<Semaphore>,
    per_call_timeout: Duration,
    result_limit: usize,
}

impl FanOutExecutor {
    pub fn new(
        client: Arc<dyn PartitionSearchClient>,
        transformer: QueryTransformer,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            client,
            transformer,
            semaphore: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            per_call_timeout: Duration::from_millis(config.per_call_timeout_ms),
            result_limit: config.result_limit,
        }
    }

    /// Search every partition concurrently.
    ///
    /// Only a failing reachability check is returned as an error; individual
    /// partition failures show up as empty results with a non-`Ok` outcome.
    pub async fn search(
        &self,
        query: &str,
        partitions: &[PartitionId],
        decomposition: Option<&ProductDecomposition>,
    ) -> AppResult<FanOutResult> {
        let started = Instant::now();

        self.client.ensure_reachable().await?;

        let input = match decomposition {
            Some(d) => QueryInput::Product(d),
            None => QueryInput::Raw(query),
        };

        let mut handles = Vec::with_capacity(partitions.len());
        for partition in partitions {
            let partition_query = self.transformer.transform(partition, input);
            tracing::info!(partition = %partition, query = %partition_query, "Partition query");

            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&self.semaphore);
            let partition = partition.clone();
            let per_call_timeout = self.per_call_timeout;
            let limit = self.result_limit;

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return PartitionResults {
                            partition,
                            query: partition_query,
                            hits: Vec::new(),
                            outcome: CallOutcome::Failed("worker pool shut down".to_string()),
                            elapsed: Duration::ZERO,
                        }
                    }
                };

                let call_started = Instant::now();
                let call = client.search(&partition, &partition_query, limit);
                let (mut hits, outcome) = match tokio::time::timeout(per_call_timeout, call).await {
                    Ok(Ok(hits)) => (hits, CallOutcome::Ok),
                    Ok(Err(e)) => (Vec::new(), CallOutcome::Failed(e.to_string())),
                    Err(_) => (Vec::new(), CallOutcome::TimedOut),
                };
                hits.truncate(limit);

                PartitionResults {
                    partition,
                    query: partition_query,
                    hits,
                    outcome,
                    elapsed: call_started.elapsed(),
                }
            }));
        }

        let joined = join_all(handles).await;

        let results: Vec<PartitionResults> = joined
            .into_iter()
            .zip(partitions)
            .map(|(joined, partition)| match joined {
                Ok(result) => result,
                Err(e) => PartitionResults {
                    partition: partition.clone(),
                    query: String::new(),
                    hits: Vec::new(),
                    outcome: CallOutcome::Failed(format!("search task aborted: {}", e)),
                    elapsed: Duration::ZERO,
                },
            })
            .collect();

        for result in &results {
            log_partition(result);
        }

        let elapsed = started.elapsed();
        tracing::info!(
            "Fan-out over {} partitions finished in {:?} ({} hits)",
            results.len(),
            elapsed,
            results.iter().map(|r| r.hits.len()).sum::<usize>()
        );

        Ok(FanOutResult { results, elapsed })
    }
}

impl Drop for FanOutExecutor {
    fn drop(&mut self) {
        // In-flight tasks keep their permits; queued ones fail fast.
        self.semaphore.close();
    }
}

fn log_partition(result: &PartitionResults) {
    match result.outcome {
        CallOutcome::Ok => {
            let top: Vec<String> = result
                .hits
                .iter()
                .take(3)
                .map(|h| format!("{:.3}", h.score))
                .collect();
            tracing::info!(
                partition = %result.partition,
                "{} results, top scores [{}]",
                result.hits.len(),
                top.join(", ")
            );
        }
        CallOutcome::Failed(ref reason) => {
            tracing::warn!(partition = %result.partition, "Search failed: {}", reason);
        }
        CallOutcome::TimedOut => {
            tracing::warn!(
                partition = %result.partition,
                "Search timed out after {:?}",
                result.elapsed
            );
        }
    }
}

pub(crate) mod millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PartitionRegistry;
    use crate::testing::StaticSearchClient;

    fn executor(client: Arc<StaticSearchClient>, config: &RetrievalConfig) -> FanOutExecutor {
        let registry = Arc::new(PartitionRegistry::builtin());
        FanOutExecutor::new(client, QueryTransformer::new(registry), config)
    }

    fn all_partitions() -> Vec<PartitionId> {
        PartitionRegistry::builtin().ids()
    }

    #[tokio::test]
    async fn test_results_follow_request_order() {
        let client = Arc::new(
            StaticSearchClient::new()
                .with_hits("usc", &[0.9])
                .with_hits("dwpe", &[0.8, 0.7]),
        );
        let fan_out = executor(client, &RetrievalConfig::default());

        let partitions: Vec<PartitionId> = vec!["usc".into(), "dwpe".into(), "rpm".into()];
        let result = fan_out.search("labeling", &partitions, None).await.unwrap();

        let order: Vec<&str> = result.results.iter().map(|r| r.partition.as_str()).collect();
        assert_eq!(order, vec!["usc", "dwpe", "rpm"]);
        assert_eq!(result.get("dwpe").unwrap().hits.len(), 2);
        assert!(result.get("rpm").unwrap().hits.is_empty());
        assert_eq!(result.total_hits(), 3);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let client = Arc::new(
            StaticSearchClient::new()
                .with_failure("ecfr", "collection not found")
                .with_hits("gras", &[0.9]),
        );
        let fan_out = executor(client, &RetrievalConfig::default());

        let result = fan_out.search("q", &all_partitions(), None).await.unwrap();

        let ecfr = result.get("ecfr").unwrap();
        assert!(ecfr.hits.is_empty());
        assert!(matches!(ecfr.outcome, CallOutcome::Failed(ref m) if m.contains("collection not found")));
        assert_eq!(result.get("gras").unwrap().hits.len(), 1);
        assert_eq!(result.degraded().count(), 1);
    }

    #[tokio::test]
    async fn test_limit_passed_and_enforced() {
        let client = Arc::new(StaticSearchClient::new().with_hits("gras", &[0.9, 0.8, 0.7, 0.6]));
        let config = RetrievalConfig {
            result_limit: 2,
            ..Default::default()
        };
        let fan_out = executor(Arc::clone(&client), &config);

        let result = fan_out.search("q", &["gras".into()], None).await.unwrap();
        assert_eq!(result.get("gras").unwrap().hits.len(), 2);
        assert_eq!(client.calls()[0].2, 2);
    }

    #[tokio::test]
    async fn test_decomposition_switches_to_product_queries() {
        let client = Arc::new(StaticSearchClient::new());
        let fan_out = executor(Arc::clone(&client), &RetrievalConfig::default());
        let decomposition = ProductDecomposition {
            ingredients: vec!["sesame".to_string()],
            ..Default::default()
        };

        fan_out
            .search("ignored", &["gras".into()], Some(&decomposition))
            .await
            .unwrap();
        let calls = client.calls();
        assert!(calls[0].1.starts_with("GRAS sesame"));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let mut client = StaticSearchClient::new();
        for id in all_partitions() {
            client = client.with_delay(id.as_str(), Duration::from_millis(30), &[0.9]);
        }
        let client = Arc::new(client);
        let config = RetrievalConfig {
            max_concurrency: 2,
            ..Default::default()
        };
        let fan_out = executor(Arc::clone(&client), &config);

        let result = fan_out.search("q", &all_partitions(), None).await.unwrap();
        assert_eq!(result.total_hits(), 7);
        assert!(client.max_in_flight() <= 2);
    }

    #[tokio::test]
    async fn test_unreachable_backend_bubbles_up() {
        let client = Arc::new(StaticSearchClient::new().unreachable());
        let fan_out = executor(Arc::clone(&client), &RetrievalConfig::default());

        let err = fan_out.search("q", &all_partitions(), None).await.unwrap_err();
        assert!(err.is_catastrophic());
        assert!(client.calls().is_empty());
    }
}
