// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unified memory engine for conversational and agentic software.
//!
//! Records facts an agent learns, retrieves them by semantic similarity, and
//! flags new facts that contradict stored ones.
//!
//! ## Architecture
//!
//! - **MemoryEngine**: extraction, contradiction scan, concurrent dual write
//! - **SqliteVectorStore**: BLOB embeddings with brute-force cosine search
//! - **SqliteGraphStore**: episodes, entity links, contradiction records
//! - **LlmFactExtractor**: one completion call per write, lenient JSON parsing
//! - **HeuristicDetector**: lexical overlap plus numeric/negation mismatch
//! - **Types**: Fact, MemoryItem, Episode, Contradiction, WriteResult

pub mod contradiction;
pub mod db;
pub mod engine;
pub mod extractor;
pub mod graph;
pub mod ids;
pub mod metrics;
pub mod traits;
pub mod types;
pub mod vector;

#[cfg(test)]
mod testing;

pub use contradiction::HeuristicDetector;
pub use engine::{EngineConfig, EngineHealth, MemoryEngine, MemoryEngineBuilder};
pub use extractor::LlmFactExtractor;
pub use graph::SqliteGraphStore;
pub use traits::{ContradictionDetector, FactExtractor, GraphStore, ItemPredicate, VectorStore};
pub use types::*;
pub use vector::SqliteVectorStore;
