// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tessera memory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Tessera configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TesseraConfig {
    /// Engine-level defaults for recall and contradiction scanning.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Embedding endpoint used by the vector store.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Fact extraction model settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Contradiction detector settings.
    #[serde(default)]
    pub contradiction: ContradictionConfig,

    /// Vector store persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Graph store settings.
    #[serde(default)]
    pub graph: GraphConfig,
}

/// Engine defaults, overridable per call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// How many nearest items `recall` and the contradiction scan consider.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum cosine similarity for a stored item to count as a match (0.0-1.0).
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Default record limit for structural knowledge queries.
    #[serde(default = "default_query_limit")]
    pub query_limit: usize,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            query_limit: default_query_limit(),
            log_level: default_log_level(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_similarity_threshold() -> f64 {
    0.7
}

fn default_query_limit() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Embedding endpoint configuration (OpenAI-compatible `/embeddings`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// API base URL, without the `/embeddings` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key. `None` falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Requested output dimensions, for models that support truncation.
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_embedding_model(),
            dimensions: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Fact extraction configuration (OpenAI-compatible `/chat/completions`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Run fact extraction on every write. When false, raw text only.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API base URL, without the `/chat/completions` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key. `None` falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Completion model used for extraction.
    #[serde(default = "default_extraction_model")]
    pub model: String,

    /// Maximum tokens the extraction response may use.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_base_url(),
            api_key: None,
            model: default_extraction_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_extraction_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

/// Contradiction detector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContradictionConfig {
    /// Check new world facts and beliefs against similar stored items.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum lexical overlap (0.0-1.0] for two statements to be compared at all.
    #[serde(default = "default_min_overlap")]
    pub min_overlap: f64,
}

impl Default for ContradictionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_overlap: default_min_overlap(),
        }
    }
}

fn default_min_overlap() -> f64 {
    0.5
}

/// Vector store persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tessera").join("tessera.db"))
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "tessera.db".to_string())
}

/// Graph store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    /// Record episodes, entities, and contradictions in the graph store.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Separate database for the graph. `None` shares `storage.database_path`.
    #[serde(default)]
    pub database_path: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_path: None,
        }
    }
}

impl GraphConfig {
    /// Resolve the graph database path, falling back to the vector store's.
    pub fn resolved_path<'a>(&'a self, storage: &'a StorageConfig) -> &'a str {
        self.database_path
            .as_deref()
            .unwrap_or(storage.database_path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_defaults_match_documented_values() {
        let engine = EngineConfig::default();
        assert_eq!(engine.top_k, 5);
        assert!((engine.similarity_threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(engine.query_limit, 10);
    }

    #[test]
    fn graph_path_falls_back_to_storage() {
        let storage = StorageConfig {
            database_path: "/tmp/vec.db".to_string(),
            wal_mode: true,
        };
        let mut graph = GraphConfig::default();
        assert_eq!(graph.resolved_path(&storage), "/tmp/vec.db");

        graph.database_path = Some("/tmp/graph.db".to_string());
        assert_eq!(graph.resolved_path(&storage), "/tmp/graph.db");
    }

    #[test]
    fn partial_section_fills_defaults() {
        let config: TesseraConfig = toml::from_str(
            r#"
[extraction]
model = "llama3"
"#,
        )
        .unwrap();
        assert_eq!(config.extraction.model, "llama3");
        assert!(config.extraction.enabled);
        assert_eq!(config.extraction.max_tokens, 2048);
    }
}
