//! Deterministic offline embeddings for tests and local dry runs.

use crate::embeddings::EmbeddingProvider;
use regscout_core::AppResult;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "with", "from", "this", "that", "have", "has", "its",
    "their", "what", "does", "need", "into",
];

/// Hashes word trigrams into a fixed-width unit vector.
///
/// Similar texts share trigrams and therefore score higher against each
/// other, which is enough to exercise the search path without a model.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2 && !STOP_WORDS.contains(w))
        {
            let padded: Vec<char> = format!(" {} ", word).chars().collect();
            for window in padded.windows(3) {
                let slot = fnv1a(window.iter().collect::<String>().as_bytes()) as usize
                    % self.dimensions;
                vector[slot] += 1.0;
            }
            let slot = fnv1a(word.as_bytes()) as usize % self.dimensions;
            vector[slot] += 2.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325u64, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }
}
