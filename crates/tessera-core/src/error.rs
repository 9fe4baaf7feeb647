// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tessera memory engine.

use thiserror::Error;

/// The primary error type used across all Tessera adapter traits and engine operations.
#[derive(Debug, Error)]
pub enum TesseraError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// LLM provider errors (API failure, token limits, model not found).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding failures (missing credentials, upstream error, empty output).
    ///
    /// Kept separate from [`TesseraError::Storage`] so callers can tell a
    /// vector store that could not embed apart from one that could not persist.
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Fact extraction produced no usable output.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Graph store errors.
    #[error("graph store error: {message}")]
    Graph {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TesseraError {
    /// Returns true if this error came from the embedding step.
    pub fn is_embedding(&self) -> bool {
        matches!(self, TesseraError::Embedding { .. })
    }
}
