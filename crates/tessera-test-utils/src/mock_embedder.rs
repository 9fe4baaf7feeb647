// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedding adapters for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tessera_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use tessera_core::{EmbeddingAdapter, PluginAdapter, TesseraError};

/// Dimensionality of [`MockEmbedder`] vectors.
pub const MOCK_DIMENSIONS: usize = 256;

/// Hashed bag-of-words embedder.
///
/// Each lowercase alphanumeric word increments one bucket; the vector is then
/// L2-normalized. Texts sharing most of their words score high, unrelated
/// texts score near zero, and identical texts score exactly 1.0.
#[derive(Debug, Default)]
pub struct MockEmbedder {
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `embed` calls served.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Embed a single text without going through the adapter trait.
    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0_f32; MOCK_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            v[bucket(&word.to_lowercase())] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

/// FNV-1a bucket index.
fn bucket(word: &str) -> usize {
    let hash = word.bytes().fold(0xcbf29ce484222325_u64, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x100000001b3)
    });
    (hash % MOCK_DIMENSIONS as u64) as usize
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, TesseraError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TesseraError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, TesseraError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| Self::vector(t)).collect(),
            dimensions: MOCK_DIMENSIONS,
        })
    }
}

/// Embedder that always fails as if credentials were missing.
#[derive(Debug, Default)]
pub struct FailingEmbedder;

#[async_trait]
impl PluginAdapter for FailingEmbedder {
    fn name(&self) -> &str {
        "failing-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, TesseraError> {
        Ok(HealthStatus::Unhealthy("no API key configured".to_string()))
    }

    async fn shutdown(&self) -> Result<(), TesseraError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for FailingEmbedder {
    async fn embed(&self, _input: EmbeddingInput) -> Result<EmbeddingOutput, TesseraError> {
        Err(TesseraError::Embedding {
            message: "no API key configured for https://api.openai.com/v1".to_string(),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn identical_texts_score_one() {
        let a = MockEmbedder::vector("The timeout is 30 seconds");
        assert!((dot(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn overlapping_texts_score_high() {
        let a = MockEmbedder::vector("The timeout is 30 seconds");
        let b = MockEmbedder::vector("The timeout is 60 seconds");
        assert!(dot(&a, &b) >= 0.75, "got {}", dot(&a, &b));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        assert!(MockEmbedder::vector("").iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn embed_counts_calls() {
        let embedder = MockEmbedder::new();
        let out = embedder.embed(EmbeddingInput::single("hello")).await.unwrap();
        assert_eq!(out.dimensions, MOCK_DIMENSIONS);
        assert_eq!(embedder.call_count(), 1);
    }
}
