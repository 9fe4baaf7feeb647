// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by [`MemoryEngine`](crate::MemoryEngine).
//!
//! The vector store, graph store, and extractor are adapters with identity and
//! health like every other Tessera adapter. The contradiction detector is a
//! plain synchronous function object.

use async_trait::async_trait;
use tessera_core::{PluginAdapter, TesseraError};

use crate::types::{
    Contradiction, Episode, Fact, MemoryItem, Metadata, SearchResult, StatementMeta,
};

/// Predicate selecting items for [`VectorStore::forget_all`].
pub type ItemPredicate = dyn Fn(&MemoryItem) -> bool + Send + Sync;

/// Semantic memory: embed, insert, similarity search, delete.
#[async_trait]
pub trait VectorStore: PluginAdapter {
    /// Embeds and stores `text`, returning the item id.
    ///
    /// Embedding failures surface as [`TesseraError::Embedding`].
    async fn remember(&self, text: &str, metadata: Metadata) -> Result<String, TesseraError>;

    /// Returns at most `top_k` items scoring at least `threshold`, best first.
    async fn recall(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>, TesseraError>;

    /// Deletes one item. Returns false if the id was unknown.
    async fn forget(&self, id: &str) -> Result<bool, TesseraError>;

    /// Deletes every item matching `predicate`, or all items when `None`.
    async fn forget_all(&self, predicate: Option<&ItemPredicate>) -> Result<usize, TesseraError>;

    /// Number of stored items.
    async fn count(&self) -> Result<usize, TesseraError>;

    /// Flushes and releases the store.
    async fn close(&self) -> Result<(), TesseraError>;
}

/// Structural memory: episodes, entity links, contradictions.
#[async_trait]
pub trait GraphStore: PluginAdapter {
    async fn upsert_episode(&self, episode: &Episode) -> Result<(), TesseraError>;

    async fn link_episode_entity(
        &self,
        episode_id: &str,
        entity_name: &str,
    ) -> Result<(), TesseraError>;

    /// Case-insensitive keyword match against summary and content.
    async fn get_episodes_by_query(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Episode>, TesseraError>;

    async fn upsert_contradiction(&self, record: &Contradiction) -> Result<(), TesseraError>;
}

/// Turns raw text into typed facts. Called at most once per write.
#[async_trait]
pub trait FactExtractor: PluginAdapter {
    async fn extract(&self, text: &str) -> Result<Vec<Fact>, TesseraError>;
}

/// Compares a stored statement with a new one.
///
/// Errors are treated by the engine as "no contradiction".
pub trait ContradictionDetector: Send + Sync + 'static {
    fn detect(
        &self,
        existing: &str,
        incoming: &str,
        existing_meta: Option<&StatementMeta>,
        incoming_meta: Option<&StatementMeta>,
    ) -> Result<Option<Contradiction>, TesseraError>;
}
