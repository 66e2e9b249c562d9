//! Data model shared by every retrieval stage.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of one independently searchable knowledge partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(String);

impl PartitionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for PartitionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PartitionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One scored result from a single partition query.
///
/// Scores stay on the backend's native similarity scale; nothing downstream
/// normalizes them across partitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub partition: PartitionId,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Leading slice of the document text
    pub text: String,
    /// Backend payload fields not lifted into the fields above
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl SearchHit {
    pub fn new(partition: impl Into<PartitionId>, score: f32, text: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            score,
            title: None,
            url: None,
            text: text.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Structured description of the product a question is about.
///
/// Produced by the decomposition service; every field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductDecomposition {
    pub ingredients: Vec<String>,
    pub processes: Vec<String>,
    pub allergens: Vec<String>,
    pub origin: String,
    pub category: String,
    pub storage_type: String,
    pub risk_level: String,
    pub packaging_concerns: Vec<String>,
    pub hazards: Vec<String>,
    pub import_type: String,
}

impl ProductDecomposition {
    /// True when no field carries any information.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A hit that survived filtering and quota selection, annotated with its
/// partition's registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedResult {
    #[serde(flatten)]
    pub hit: SearchHit,
    pub role: String,
    pub description: String,
}

impl MergedResult {
    pub fn score(&self) -> f32 {
        self.hit.score
    }

    pub fn partition(&self) -> &PartitionId {
        &self.hit.partition
    }
}

/// A numbered source reference for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based, contiguous within a request
    pub index: usize,
    pub partition: PartitionId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub score: f32,
}
