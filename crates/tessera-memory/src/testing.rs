// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-crate fakes for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use tessera_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use tessera_core::{EmbeddingAdapter, PluginAdapter, TesseraError};
use tokio::sync::Barrier;

use crate::graph::SqliteGraphStore;
use crate::traits::{FactExtractor, GraphStore, ItemPredicate, VectorStore};
use crate::types::{Contradiction, Episode, Fact, Metadata, SearchResult};
use crate::vector::SqliteVectorStore;

pub(crate) const DIM: usize = 64;

macro_rules! fake_adapter {
    ($ty:ty, $name:expr, $kind:expr) => {
        #[async_trait]
        impl PluginAdapter for $ty {
            fn name(&self) -> &str {
                $name
            }
            fn version(&self) -> semver::Version {
                semver::Version::new(0, 1, 0)
            }
            fn adapter_type(&self) -> AdapterType {
                $kind
            }
            async fn health_check(&self) -> Result<HealthStatus, TesseraError> {
                Ok(HealthStatus::Healthy)
            }
            async fn shutdown(&self) -> Result<(), TesseraError> {
                Ok(())
            }
        }
    };
}

/// Bag-of-words embedder: one bucket per hashed lowercase word.
pub(crate) struct WordEmbedder;

pub(crate) fn word_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let hash = word
            .to_lowercase()
            .bytes()
            .fold(0xcbf29ce484222325_u64, |h, b| {
                (h ^ u64::from(b)).wrapping_mul(0x100000001b3)
            });
        v[(hash % DIM as u64) as usize] += 1.0;
    }
    v
}

fake_adapter!(WordEmbedder, "word", AdapterType::Embedding);

#[async_trait]
impl EmbeddingAdapter for WordEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, TesseraError> {
        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| word_vector(t)).collect(),
            dimensions: DIM,
        })
    }
}

/// Embedder whose upstream fails with a provider error.
pub(crate) struct BrokenEmbedder;

#[async_trait]
impl PluginAdapter for BrokenEmbedder {
    fn name(&self) -> &str {
        "broken"
    }
    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }
    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }
    async fn health_check(&self) -> Result<HealthStatus, TesseraError> {
        Ok(HealthStatus::Unhealthy("no key".into()))
    }
    async fn shutdown(&self) -> Result<(), TesseraError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for BrokenEmbedder {
    async fn embed(&self, _input: EmbeddingInput) -> Result<EmbeddingOutput, TesseraError> {
        Err(TesseraError::Provider {
            message: "401 unauthorized".into(),
            source: None,
        })
    }
}

/// Extractor returning the same facts for every input.
pub(crate) struct FixedExtractor(pub Vec<Fact>);

fake_adapter!(FixedExtractor, "fixed", AdapterType::Extractor);

#[async_trait]
impl FactExtractor for FixedExtractor {
    async fn extract(&self, _text: &str) -> Result<Vec<Fact>, TesseraError> {
        Ok(self.0.clone())
    }
}

/// Extractor that always fails.
pub(crate) struct FailingExtractor;

fake_adapter!(FailingExtractor, "failing", AdapterType::Extractor);

#[async_trait]
impl FactExtractor for FailingExtractor {
    async fn extract(&self, _text: &str) -> Result<Vec<Fact>, TesseraError> {
        Err(TesseraError::Extraction("model returned prose".into()))
    }
}

/// SQLite vector store whose writes can wait on a barrier and whose reads
/// can be made to fail.
pub(crate) struct GatedVectorStore {
    pub inner: SqliteVectorStore,
    pub gate: Option<Arc<Barrier>>,
    pub fail_reads: bool,
}

fake_adapter!(GatedVectorStore, "gated-vector", AdapterType::VectorStore);

#[async_trait]
impl VectorStore for GatedVectorStore {
    async fn remember(&self, text: &str, metadata: Metadata) -> Result<String, TesseraError> {
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        self.inner.remember(text, metadata).await
    }

    async fn recall(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>, TesseraError> {
        if self.fail_reads {
            return Err(TesseraError::Storage {
                source: "disk I/O error".into(),
            });
        }
        self.inner.recall(query, top_k, threshold).await
    }

    async fn forget(&self, id: &str) -> Result<bool, TesseraError> {
        self.inner.forget(id).await
    }

    async fn forget_all(&self, predicate: Option<&ItemPredicate>) -> Result<usize, TesseraError> {
        self.inner.forget_all(predicate).await
    }

    async fn count(&self) -> Result<usize, TesseraError> {
        self.inner.count().await
    }

    async fn close(&self) -> Result<(), TesseraError> {
        self.inner.close().await
    }
}

/// SQLite graph store whose episode upserts wait on a barrier.
pub(crate) struct GatedGraphStore {
    pub inner: SqliteGraphStore,
    pub gate: Arc<Barrier>,
}

fake_adapter!(GatedGraphStore, "gated-graph", AdapterType::GraphStore);

#[async_trait]
impl GraphStore for GatedGraphStore {
    async fn upsert_episode(&self, episode: &Episode) -> Result<(), TesseraError> {
        self.gate.wait().await;
        self.inner.upsert_episode(episode).await
    }

    async fn link_episode_entity(
        &self,
        episode_id: &str,
        entity_name: &str,
    ) -> Result<(), TesseraError> {
        self.inner.link_episode_entity(episode_id, entity_name).await
    }

    async fn get_episodes_by_query(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Episode>, TesseraError> {
        self.inner.get_episodes_by_query(query, limit).await
    }

    async fn upsert_contradiction(&self, record: &Contradiction) -> Result<(), TesseraError> {
        self.inner.upsert_contradiction(record).await
    }
}
