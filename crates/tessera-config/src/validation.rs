// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that serde attributes cannot express:
//! value ranges, non-empty paths, and non-zero limits.

use crate::diagnostic::ConfigError;
use crate::model::TesseraConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of failing fast.
pub fn validate_config(config: &TesseraConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let threshold = config.engine.similarity_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.similarity_threshold must be between 0.0 and 1.0, got {threshold}"
            ),
        });
    }

    if config.engine.top_k == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.top_k must be at least 1".to_string(),
        });
    }

    if config.engine.query_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.query_limit must be at least 1".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if let Some(path) = &config.graph.database_path
        && path.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "graph.database_path must not be empty when set".to_string(),
        });
    }

    let overlap = config.contradiction.min_overlap;
    if overlap <= 0.0 || overlap > 1.0 {
        errors.push(ConfigError::Validation {
            message: format!("contradiction.min_overlap must be in (0.0, 1.0], got {overlap}"),
        });
    }

    if config.embedding.model.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "embedding.model must not be empty".to_string(),
        });
    }

    if config.extraction.enabled && config.extraction.model.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "extraction.model must not be empty when extraction is enabled".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
