//! Qdrant REST implementation of [`PartitionSearchClient`].
//!
//! Each partition is one Qdrant collection. Queries are embedded with the
//! configured provider and sent to `/collections/{name}/points/search`.

use crate::embeddings::EmbeddingProvider;
use crate::search_client::PartitionSearchClient;
use crate::types::{PartitionId, SearchHit};
use async_trait::async_trait;
use regscout_core::config::SearchConfig;
use regscout_core::{AppError, AppResult};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub struct QdrantSearchClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    embedder: Arc<dyn EmbeddingProvider>,
    snippet_chars: usize,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

impl QdrantSearchClient {
    pub fn new(
        config: &SearchConfig,
        api_key: Option<String>,
        embedder: Arc<dyn EmbeddingProvider>,
        snippet_chars: usize,
    ) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create Qdrant HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            embedder,
            snippet_chars,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref key) => request.header("api-key", key),
            None => request,
        }
    }
}

#[async_trait]
impl PartitionSearchClient for QdrantSearchClient {
    async fn search(
        &self,
        partition: &PartitionId,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<SearchHit>> {
        let vector = self.embedder.embed(query).await?;

        let url = format!("{}/collections/{}/points/search", self.base_url, partition);
        let response = self
            .authorized(self.http.post(&url))
            .json(&SearchRequest {
                vector: &vector,
                limit,
                with_payload: true,
            })
            .send()
            .await
            .map_err(|e| AppError::Search(format!("Qdrant request for '{}' failed: {}", partition, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Search(format!(
                "Qdrant search on '{}' returned {}: {}",
                partition, status, body
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Search(format!("Invalid Qdrant response for '{}': {}", partition, e)))?;

        Ok(body
            .result
            .into_iter()
            .map(|point| into_hit(partition, point, self.snippet_chars))
            .collect())
    }

    async fn ensure_reachable(&self) -> AppResult<()> {
        let url = format!("{}/collections", self.base_url);
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|e| {
                AppError::SearchUnavailable(format!("Cannot reach Qdrant at {}: {}", self.base_url, e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::SearchUnavailable(format!(
                "Qdrant at {} answered {}",
                self.base_url,
                response.status()
            )));
        }

        Ok(())
    }
}

/// Lift `text`, `title` and `url` out of the payload; the rest passes
/// through as metadata.
fn into_hit(partition: &PartitionId, point: ScoredPoint, snippet_chars: usize) -> SearchHit {
    let mut payload = point.payload.unwrap_or_default();

    let text = take_string(&mut payload, "text").unwrap_or_default();
    let title = take_string(&mut payload, "title").filter(|t| !t.trim().is_empty());
    let url = take_string(&mut payload, "url").filter(|u| !u.trim().is_empty());

    SearchHit {
        partition: partition.clone(),
        score: point.score,
        title,
        url,
        text: truncate_chars(&text, snippet_chars),
        metadata: payload,
    }
}

fn take_string(payload: &mut Map<String, Value>, key: &str) -> Option<String> {
    match payload.remove(key)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => {
            payload.insert(key.to_string(), other);
            None
        }
    }
}

/// First `max` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
