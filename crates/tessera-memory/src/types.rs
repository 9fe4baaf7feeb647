// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types for the unified memory engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Free-form metadata attached to a stored memory item.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Taxonomy bucket for an extracted fact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FactNetwork {
    /// General truths about the world.
    WorldFact,
    /// Things the agent did or observed.
    Experience,
    /// Knowledge about a named entity.
    EntitySummary,
    /// A held opinion or preference.
    Belief,
}

impl FactNetwork {
    /// Only world facts and beliefs can contradict stored memories.
    /// Experiences and entity summaries are append-only.
    pub fn is_conflict_checked(self) -> bool {
        matches!(self, FactNetwork::WorldFact | FactNetwork::Belief)
    }
}

/// A named entity referenced by a fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
}

/// A directed relationship between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: String,
    pub to: String,
    #[serde(rename = "type", default)]
    pub relation_type: String,
}

/// One atomic claim extracted from input text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub network: FactNetwork,
    pub statement: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// Extractor confidence in `[0, 1]`. Carried through, never used for gating.
    pub confidence: f64,
}

impl Fact {
    /// A fact with no entities or relationships and full confidence.
    pub fn new(network: FactNetwork, statement: impl Into<String>) -> Self {
        Self {
            network,
            statement: statement.into(),
            entities: Vec::new(),
            relationships: Vec::new(),
            confidence: 1.0,
        }
    }

    /// Adds an entity reference.
    pub fn with_entity(mut self, name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        self.entities.push(Entity {
            name: name.into(),
            entity_type: entity_type.into(),
        });
        self
    }

    /// Adds a relationship between two entities.
    pub fn with_relationship(
        mut self,
        from: impl Into<String>,
        relation_type: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.relationships.push(Relationship {
            from: from.into(),
            to: to.into(),
            relation_type: relation_type.into(),
        });
        self
    }
}

/// One unit of vector-store storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub id: String,
    /// The original input text, not an extracted statement.
    pub text: String,
    pub metadata: Metadata,
    pub timestamp: DateTime<Utc>,
}

/// A memory item with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub item: MemoryItem,
    pub score: f32,
}

/// Label for an episode, derived from the fact networks of a write.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EpisodeType {
    Conversation,
    Observation,
    Action,
    Decision,
    Learning,
}

/// One unit of graph-store storage: a single write event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Shared with the write id of the `remember` call that produced it.
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub episode_type: EpisodeType,
    /// Fact statements joined.
    pub summary: String,
    /// Raw input text.
    pub content: String,
    /// Deduplicated entity names, in first-appearance order.
    pub entities: Vec<String>,
    /// Relationships flattened to `from type to` strings.
    pub relationships: Vec<String>,
}

/// Provenance for a statement compared by a contradiction detector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementMeta {
    pub source: String,
    pub id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// One side of a contradiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingStatement {
    pub statement: String,
    pub source: String,
    pub id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConflictingStatement {
    /// Builds one side from a statement and its optional provenance.
    pub fn new(statement: &str, meta: Option<&StatementMeta>, default_source: &str) -> Self {
        Self {
            statement: statement.to_string(),
            source: meta
                .map(|m| m.source.clone())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| default_source.to_string()),
            id: meta.and_then(|m| m.id.clone()),
            timestamp: meta.and_then(|m| m.timestamp),
        }
    }
}

/// Which side of a contradiction an external resolver kept.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Winner {
    Existing,
    New,
}

/// A detected conflict between a new fact and a stored memory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contradiction {
    pub id: String,
    pub detected_at: DateTime<Utc>,
    pub existing_fact: ConflictingStatement,
    pub new_fact: ConflictingStatement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// How a write was classified.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Operation {
    /// No contradiction was found.
    Add,
    /// The write contradicts a stored item. The old item is flagged, not replaced.
    Update,
}

/// Result of a `remember` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    pub id: String,
    pub operation: Operation,
    /// Empty means "stored but not enriched", not an error.
    pub facts: Vec<Fact>,
    pub vector_store_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_store_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contradiction: Option<Contradiction>,
}

/// Per-call overrides for `remember`'s contradiction scan.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RememberOptions {
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
}

/// Per-call overrides for `recall`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecallOptions {
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
}

/// Convert f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert SQLite BLOB back to f32 vector. Trailing partial chunks are dropped.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or zero-norm inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn fact_network_labels() {
        assert_eq!(FactNetwork::WorldFact.to_string(), "world_fact");
        assert_eq!(
            FactNetwork::from_str("entity_summary").unwrap(),
            FactNetwork::EntitySummary
        );
        assert!(FactNetwork::from_str("opinion").is_err());

        assert!(FactNetwork::WorldFact.is_conflict_checked());
        assert!(FactNetwork::Belief.is_conflict_checked());
        assert!(!FactNetwork::Experience.is_conflict_checked());
        assert!(!FactNetwork::EntitySummary.is_conflict_checked());
    }

    #[test]
    fn fact_deserializes_with_type_keys() {
        let fact: Fact = serde_json::from_str(
            r#"{
                "network": "experience",
                "statement": "Deployed v2.0 to production",
                "entities": [{"name": "v2.0", "type": "release"}],
                "relationships": [{"from": "agent", "to": "v2.0", "type": "deployed"}],
                "confidence": 0.8
            }"#,
        )
        .unwrap();
        assert_eq!(fact.network, FactNetwork::Experience);
        assert_eq!(fact.entities[0].entity_type, "release");
        assert_eq!(fact.relationships[0].relation_type, "deployed");
    }

    #[test]
    fn write_result_serializes_camel_case() {
        let result = WriteResult {
            id: "mem_1_a".into(),
            operation: Operation::Add,
            facts: vec![],
            vector_store_id: "mem_1_a".into(),
            graph_store_id: None,
            contradiction: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["operation"], "ADD");
        assert_eq!(json["vectorStoreId"], "mem_1_a");
        assert!(json.get("graphStoreId").is_none());
        assert!(json.get("contradiction").is_none());
        assert_eq!(Operation::Update.to_string(), "UPDATE");
    }

    #[test]
    fn conflicting_statement_falls_back_to_default_source() {
        let side = ConflictingStatement::new("x", None, "memory");
        assert_eq!(side.source, "memory");
        assert!(side.id.is_none());

        let meta = StatementMeta {
            source: "vector_store".into(),
            id: Some("mem_1".into()),
            timestamp: None,
        };
        let side = ConflictingStatement::new("x", Some(&meta), "memory");
        assert_eq!(side.source, "vector_store");
        assert_eq!(side.id.as_deref(), Some("mem_1"));
    }

    #[test]
    fn vec_to_blob_roundtrip() {
        let original = vec![0.1_f32, 0.2, 0.3, -0.5, 1.0];
        let recovered = blob_to_vec(&vec_to_blob(&original));
        assert_eq!(original, recovered);
    }

    #[test]
    fn cosine_similarity_cases() {
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < f32::EPSILON);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
