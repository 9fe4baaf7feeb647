// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete memory engine with mock adapters and
//! temp-dir SQLite stores. Tests drive it through `harness.engine` and inspect
//! the stores directly.

use std::sync::Arc;

use tessera_core::{EmbeddingAdapter, TesseraError};
use tessera_memory::{
    ContradictionDetector, EngineConfig, FactExtractor, HeuristicDetector, LlmFactExtractor,
    MemoryEngine, SqliteGraphStore, SqliteVectorStore,
};

use crate::mock_embedder::MockEmbedder;
use crate::mock_extractor::FailingExtractor;
use crate::mock_provider::MockProvider;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    graph_store: bool,
    extractor_responses: Option<Vec<String>>,
    extractor: Option<Arc<dyn FactExtractor>>,
    detector: Option<Arc<dyn ContradictionDetector>>,
    embedder: Option<Arc<dyn EmbeddingAdapter>>,
    config: EngineConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            graph_store: false,
            extractor_responses: None,
            extractor: None,
            detector: None,
            embedder: None,
            config: EngineConfig::default(),
        }
    }

    /// Attach a SQLite graph store.
    pub fn with_graph_store(mut self) -> Self {
        self.graph_store = true;
        self
    }

    /// Extract facts with the LLM extractor over a [`MockProvider`] that
    /// replies with `responses` in order.
    pub fn with_extractor_responses(mut self, responses: Vec<String>) -> Self {
        self.extractor_responses = Some(responses);
        self
    }

    /// Use a custom extractor. Overrides `with_extractor_responses`.
    pub fn with_extractor(mut self, extractor: Arc<dyn FactExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Use an extractor that always fails.
    pub fn with_failing_extractor(self) -> Self {
        self.with_extractor(Arc::new(FailingExtractor))
    }

    pub fn with_detector(mut self, detector: Arc<dyn ContradictionDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Use the lexical detector with its default overlap.
    pub fn with_heuristic_detector(self) -> Self {
        self.with_detector(Arc::new(HeuristicDetector::default()))
    }

    /// Replace the default [`MockEmbedder`].
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingAdapter>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, TesseraError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| TesseraError::Storage { source: e.into() })?;
        let vector_path = temp_dir.path().join("vectors.db");
        let graph_path = temp_dir.path().join("graph.db");

        let embedder: Arc<dyn EmbeddingAdapter> = match self.embedder {
            Some(embedder) => embedder,
            None => Arc::new(MockEmbedder::new()),
        };
        let vector_store = Arc::new(
            SqliteVectorStore::open(&vector_path.to_string_lossy(), true, embedder).await?,
        );

        let graph_store = if self.graph_store {
            Some(Arc::new(
                SqliteGraphStore::open(&graph_path.to_string_lossy(), true).await?,
            ))
        } else {
            None
        };

        let mock_provider = Arc::new(match self.extractor_responses {
            Some(ref responses) => MockProvider::with_responses(responses.clone()),
            None => MockProvider::new(),
        });

        let extractor: Option<Arc<dyn FactExtractor>> =
            match (self.extractor, self.extractor_responses) {
                (Some(extractor), _) => Some(extractor),
                (None, Some(_)) => Some(Arc::new(LlmFactExtractor::new(
                    mock_provider.clone(),
                    "mock-model".to_string(),
                    1024,
                ))),
                (None, None) => None,
            };

        let mut builder = MemoryEngine::builder(vector_store.clone()).config(self.config);
        if let Some(graph) = &graph_store {
            builder = builder.graph_store(graph.clone());
        }
        if let Some(extractor) = extractor {
            builder = builder.extractor(extractor);
        }
        if let Some(detector) = self.detector {
            builder = builder.detector(detector);
        }

        Ok(TestHarness {
            engine: builder.build(),
            vector_store,
            graph_store,
            mock_provider,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete memory stack for end-to-end tests.
pub struct TestHarness {
    pub engine: MemoryEngine,
    pub vector_store: Arc<SqliteVectorStore>,
    pub graph_store: Option<Arc<SqliteGraphStore>>,
    /// Backs the LLM extractor when built with `with_extractor_responses`.
    pub mock_provider: Arc<MockProvider>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_harness_has_vector_store_only() {
        let harness = TestHarness::builder().build().await.unwrap();
        assert!(!harness.engine.has_graph_store());
        assert!(harness.graph_store.is_none());
        assert_eq!(harness.engine.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn extractor_responses_drive_the_mock_provider() {
        let harness = TestHarness::builder()
            .with_graph_store()
            .with_extractor_responses(vec![
                r#"{"facts": [{"network": "world_fact", "statement": "Rust is fast"}]}"#.into(),
            ])
            .build()
            .await
            .unwrap();

        let result = harness.engine.remember("Rust is fast", None).await.unwrap();
        assert_eq!(result.facts.len(), 1);
        assert_eq!(harness.mock_provider.request_count().await, 1);
        assert!(result.graph_store_id.is_some());
    }
}
