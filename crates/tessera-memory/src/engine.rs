// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The unified memory engine.
//!
//! A `remember` call moves through extraction, a contradiction scan, and a
//! concurrent dual write to the vector and graph stores. Only vector store
//! reads and writes can fail the call; every other stage degrades to a log
//! line and a metric.
//!
//! Concurrent writes are not serialized against each other: two calls carrying
//! conflicting facts can both scan before either has written, and both will
//! report `ADD`. Contradiction detection favors availability over
//! linearizability.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tessera_core::types::HealthStatus;
use tessera_core::{PluginAdapter, TesseraError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ids::generate_write_id;
use crate::metrics;
use crate::traits::{ContradictionDetector, FactExtractor, GraphStore, VectorStore};
use crate::types::{
    Contradiction, Episode, EpisodeType, Fact, FactNetwork, Metadata, Operation, RecallOptions,
    RememberOptions, SearchResult, StatementMeta, WriteResult,
};
use crate::vector::WRITE_ID_KEY;

/// Engine-level defaults, overridable per call.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Candidates considered by `recall` and the contradiction scan.
    pub top_k: usize,
    /// Minimum similarity for a candidate to be considered.
    pub similarity_threshold: f32,
    /// Default record limit for `query_knowledge`.
    pub query_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.7,
            query_limit: 10,
        }
    }
}

impl From<&tessera_config::model::EngineConfig> for EngineConfig {
    fn from(config: &tessera_config::model::EngineConfig) -> Self {
        Self {
            top_k: config.top_k,
            similarity_threshold: config.similarity_threshold as f32,
            query_limit: config.query_limit,
        }
    }
}

/// Health of the engine and each configured collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineHealth {
    pub vector_store: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_store: Option<HealthStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extractor: Option<HealthStatus>,
}

impl EngineHealth {
    /// Healthy only when every configured collaborator is healthy.
    pub fn is_healthy(&self) -> bool {
        std::iter::once(&self.vector_store)
            .chain(self.graph_store.as_ref())
            .chain(self.extractor.as_ref())
            .all(|s| *s == HealthStatus::Healthy)
    }
}

/// Builder for [`MemoryEngine`]. Only the vector store is required.
pub struct MemoryEngineBuilder {
    vector_store: Arc<dyn VectorStore>,
    graph_store: Option<Arc<dyn GraphStore>>,
    extractor: Option<Arc<dyn FactExtractor>>,
    detector: Option<Arc<dyn ContradictionDetector>>,
    config: EngineConfig,
}

impl MemoryEngineBuilder {
    pub fn graph_store(mut self, store: Arc<dyn GraphStore>) -> Self {
        self.graph_store = Some(store);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn FactExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn detector(mut self, detector: Arc<dyn ContradictionDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> MemoryEngine {
        MemoryEngine {
            vector_store: self.vector_store,
            graph_store: self.graph_store,
            extractor: self.extractor,
            detector: self.detector,
            config: self.config,
        }
    }
}

/// Orchestrates extraction, contradiction checks, and dual-store writes.
///
/// Holds no locks and no mutable state; safe to share across tasks.
pub struct MemoryEngine {
    vector_store: Arc<dyn VectorStore>,
    graph_store: Option<Arc<dyn GraphStore>>,
    extractor: Option<Arc<dyn FactExtractor>>,
    detector: Option<Arc<dyn ContradictionDetector>>,
    config: EngineConfig,
}

impl MemoryEngine {
    /// Start building an engine over `vector_store`.
    pub fn builder(vector_store: Arc<dyn VectorStore>) -> MemoryEngineBuilder {
        MemoryEngineBuilder {
            vector_store,
            graph_store: None,
            extractor: None,
            detector: None,
            config: EngineConfig::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether structural queries are available.
    pub fn has_graph_store(&self) -> bool {
        self.graph_store.is_some()
    }

    /// Record `text` with engine defaults.
    pub async fn remember(
        &self,
        text: &str,
        metadata: Option<Metadata>,
    ) -> Result<WriteResult, TesseraError> {
        self.remember_with_cancel(
            text,
            metadata,
            RememberOptions::default(),
            &CancellationToken::new(),
        )
        .await
    }

    /// Record `text` with per-call scan overrides.
    pub async fn remember_with_options(
        &self,
        text: &str,
        metadata: Option<Metadata>,
        options: RememberOptions,
    ) -> Result<WriteResult, TesseraError> {
        self.remember_with_cancel(text, metadata, options, &CancellationToken::new())
            .await
    }

    /// Record `text`, aborting with [`TesseraError::Cancelled`] once `cancel` fires.
    ///
    /// Cancellation is checked around extraction, the contradiction scan, and
    /// the dual write. A write already committed by a store when the token fires
    /// is not rolled back.
    pub async fn remember_with_cancel(
        &self,
        text: &str,
        metadata: Option<Metadata>,
        options: RememberOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, TesseraError> {
        let started = Instant::now();
        let write_id = generate_write_id();
        let timestamp = Utc::now();

        let facts = cancellable(cancel, self.extract_facts(&write_id, text)).await?;

        let contradiction = if facts.is_empty() {
            None
        } else {
            cancellable(
                cancel,
                self.find_contradiction(&write_id, timestamp, &facts, options),
            )
            .await?
        };

        let operation = if contradiction.is_some() {
            Operation::Update
        } else {
            Operation::Add
        };

        let metadata = write_metadata(metadata, &write_id, timestamp, operation, &facts);
        let vector_write = self.vector_store.remember(text, metadata);
        let graph_write = self.write_episode(&write_id, timestamp, text, &facts);

        let (vector_result, graph_store_id) = cancellable(cancel, async {
            let (vector_result, graph_result) = tokio::join!(vector_write, graph_write);
            Ok((vector_result, graph_result))
        })
        .await?;
        let vector_store_id = vector_result?;

        metrics::record_write(operation);
        metrics::record_write_latency(started.elapsed().as_secs_f64());
        info!(
            write_id = %write_id,
            operation = %operation,
            fact_count = facts.len(),
            graph = graph_store_id.is_some(),
            "memory recorded"
        );

        Ok(WriteResult {
            id: write_id,
            operation,
            facts,
            vector_store_id,
            graph_store_id,
            contradiction,
        })
    }

    /// Similarity search over the vector store.
    pub async fn recall(
        &self,
        query: &str,
        options: RecallOptions,
    ) -> Result<Vec<SearchResult>, TesseraError> {
        let top_k = options.top_k.unwrap_or(self.config.top_k);
        let threshold = options
            .threshold
            .unwrap_or(self.config.similarity_threshold);
        self.vector_store.recall(query, top_k, threshold).await
    }

    /// Keyword query over graph episodes. Empty without a graph store.
    pub async fn query_knowledge(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Episode>, TesseraError> {
        let Some(graph) = &self.graph_store else {
            return Ok(Vec::new());
        };
        graph
            .get_episodes_by_query(query, limit.unwrap_or(self.config.query_limit))
            .await
    }

    /// Delete a vector item. Episodes in the graph store are kept.
    pub async fn forget(&self, id: &str) -> Result<bool, TesseraError> {
        let removed = self.vector_store.forget(id).await?;
        debug!(id, removed, "forget");
        Ok(removed)
    }

    /// Number of items in the vector store.
    pub async fn count(&self) -> Result<usize, TesseraError> {
        self.vector_store.count().await
    }

    /// Close the vector store. The graph store belongs to the caller.
    pub async fn close(&self) -> Result<(), TesseraError> {
        self.vector_store.close().await
    }

    /// Query every configured collaborator's health.
    pub async fn health(&self) -> EngineHealth {
        EngineHealth {
            vector_store: check(self.vector_store.as_ref()).await,
            graph_store: match &self.graph_store {
                Some(g) => Some(check(g.as_ref()).await),
                None => None,
            },
            extractor: match &self.extractor {
                Some(e) => Some(check(e.as_ref()).await),
                None => None,
            },
        }
    }

    async fn extract_facts(&self, write_id: &str, text: &str) -> Result<Vec<Fact>, TesseraError> {
        let Some(extractor) = &self.extractor else {
            return Ok(Vec::new());
        };
        match extractor.extract(text).await {
            Ok(facts) => {
                debug!(write_id, fact_count = facts.len(), "facts extracted");
                Ok(facts)
            }
            Err(e) => {
                warn!(write_id, error = %e, "fact extraction failed, storing raw text");
                metrics::record_degraded("extraction");
                Ok(Vec::new())
            }
        }
    }

    /// Scan conflict-checked facts against their nearest stored items.
    ///
    /// The first detected contradiction ends the whole scan. A failed vector
    /// read fails the write; a failed detector call counts as no conflict.
    async fn find_contradiction(
        &self,
        write_id: &str,
        timestamp: DateTime<Utc>,
        facts: &[Fact],
        options: RememberOptions,
    ) -> Result<Option<Contradiction>, TesseraError> {
        let Some(detector) = &self.detector else {
            return Ok(None);
        };
        let top_k = options.top_k.unwrap_or(self.config.top_k);
        let threshold = options
            .threshold
            .unwrap_or(self.config.similarity_threshold);
        let incoming_meta = StatementMeta {
            source: "remember".to_string(),
            id: Some(write_id.to_string()),
            timestamp: Some(timestamp),
        };

        for fact in facts.iter().filter(|f| f.network.is_conflict_checked()) {
            let candidates = self
                .vector_store
                .recall(&fact.statement, top_k, threshold)
                .await?;

            for candidate in candidates {
                let existing_meta = StatementMeta {
                    source: "vector_store".to_string(),
                    id: Some(candidate.item.id.clone()),
                    timestamp: Some(candidate.item.timestamp),
                };
                match detector.detect(
                    &candidate.item.text,
                    &fact.statement,
                    Some(&existing_meta),
                    Some(&incoming_meta),
                ) {
                    Ok(Some(found)) => {
                        info!(
                            write_id,
                            existing_id = %candidate.item.id,
                            score = candidate.score,
                            "contradiction detected"
                        );
                        metrics::record_contradiction();
                        self.persist_contradiction(write_id, &found).await;
                        return Ok(Some(found));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(write_id, error = %e, "contradiction detector failed");
                        metrics::record_degraded("contradiction");
                    }
                }
            }
        }
        Ok(None)
    }

    async fn persist_contradiction(&self, write_id: &str, contradiction: &Contradiction) {
        let Some(graph) = &self.graph_store else {
            return;
        };
        if let Err(e) = graph.upsert_contradiction(contradiction).await {
            warn!(write_id, error = %e, "failed to persist contradiction");
            metrics::record_degraded("graph");
        }
    }

    /// Upsert the episode and link its entities. Returns the episode id on success.
    async fn write_episode(
        &self,
        write_id: &str,
        timestamp: DateTime<Utc>,
        text: &str,
        facts: &[Fact],
    ) -> Option<String> {
        let graph = self.graph_store.as_ref()?;
        if facts.is_empty() {
            return None;
        }

        let episode = build_episode(write_id, timestamp, text, facts);
        let result = async {
            graph.upsert_episode(&episode).await?;
            for entity in &episode.entities {
                graph.link_episode_entity(&episode.id, entity).await?;
            }
            Ok::<(), TesseraError>(())
        }
        .await;

        match result {
            Ok(()) => Some(episode.id),
            Err(e) => {
                warn!(write_id, error = %e, "graph write failed");
                metrics::record_degraded("graph");
                None
            }
        }
    }
}

async fn check<A: PluginAdapter + ?Sized>(adapter: &A) -> HealthStatus {
    adapter
        .health_check()
        .await
        .unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()))
}

/// Race `fut` against the token.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, TesseraError>>,
) -> Result<T, TesseraError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TesseraError::Cancelled),
        result = fut => result,
    }
}

/// Caller metadata overlaid with the engine's bookkeeping keys.
fn write_metadata(
    metadata: Option<Metadata>,
    write_id: &str,
    timestamp: DateTime<Utc>,
    operation: Operation,
    facts: &[Fact],
) -> Metadata {
    let mut metadata = metadata.unwrap_or_default();
    let networks: Vec<String> = facts.iter().map(|f| f.network.to_string()).collect();
    let statements: Vec<&str> = facts.iter().map(|f| f.statement.as_str()).collect();

    metadata.insert(WRITE_ID_KEY.to_string(), json!(write_id));
    metadata.insert("timestamp".to_string(), json!(timestamp.to_rfc3339()));
    metadata.insert("operation".to_string(), json!(operation.to_string()));
    metadata.insert("factNetworks".to_string(), json!(networks));
    metadata.insert("factCount".to_string(), Value::from(facts.len()));
    metadata.insert("factStatements".to_string(), json!(statements));
    metadata
}

/// Build the graph episode for one write.
pub fn build_episode(
    write_id: &str,
    timestamp: DateTime<Utc>,
    text: &str,
    facts: &[Fact],
) -> Episode {
    let mut seen = HashSet::new();
    let entities = facts
        .iter()
        .flat_map(|f| f.entities.iter())
        .map(|e| e.name.trim())
        .filter(|name| !name.is_empty() && seen.insert(name.to_string()))
        .map(str::to_string)
        .collect();

    let relationships = facts
        .iter()
        .flat_map(|f| f.relationships.iter())
        .map(|r| format!("{} {} {}", r.from, r.relation_type, r.to))
        .collect();

    Episode {
        id: write_id.to_string(),
        timestamp,
        episode_type: classify_episode_type(facts),
        summary: facts
            .iter()
            .map(|f| f.statement.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        content: text.to_string(),
        entities,
        relationships,
    }
}

/// Label a write by its dominant fact networks.
///
/// Precedence: any experience is an action, else any belief is a decision,
/// else more entity summaries than world facts is an observation, else learning.
pub fn classify_episode_type(facts: &[Fact]) -> EpisodeType {
    let count = |network: FactNetwork| facts.iter().filter(|f| f.network == network).count();

    if count(FactNetwork::Experience) > 0 {
        EpisodeType::Action
    } else if count(FactNetwork::Belief) > 0 {
        EpisodeType::Decision
    } else if count(FactNetwork::EntitySummary) > count(FactNetwork::WorldFact) {
        EpisodeType::Observation
    } else {
        EpisodeType::Learning
    }
}
