// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tessera memory engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Tessera workspace. The embedding and
//! completion backends the engine delegates to implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TesseraError;
pub use types::{
    AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus, ProviderMessage,
    ProviderRequest, ProviderResponse, TokenUsage,
};

pub use traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tessera_error_variants_render() {
        let storage = TesseraError::Storage {
            source: Box::new(std::io::Error::other("disk full")),
        };
        assert_eq!(storage.to_string(), "storage error: disk full");

        let embedding = TesseraError::Embedding {
            message: "missing api key".into(),
            source: None,
        };
        assert!(embedding.is_embedding());
        assert_eq!(embedding.to_string(), "embedding error: missing api key");

        let provider = TesseraError::Provider {
            message: "503".into(),
            source: None,
        };
        assert!(!provider.is_embedding());

        assert_eq!(TesseraError::Cancelled.to_string(), "operation cancelled");
        let timeout = TesseraError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        assert!(timeout.to_string().contains("30s"));
    }

    #[test]
    fn adapter_type_display_roundtrip() {
        use std::str::FromStr;

        let variants = [
            AdapterType::Provider,
            AdapterType::Embedding,
            AdapterType::VectorStore,
            AdapterType::GraphStore,
            AdapterType::Extractor,
        ];

        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn health_status_serializes_with_detail() {
        let json = serde_json::to_value(HealthStatus::Degraded("slow".into())).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["detail"], "slow");

        let healthy = serde_json::to_value(HealthStatus::Healthy).unwrap();
        assert_eq!(healthy["status"], "healthy");
    }

    #[test]
    fn embedding_input_single() {
        let input = EmbeddingInput::single("hello world");
        assert_eq!(input.texts, vec!["hello world".to_string()]);
    }

    #[test]
    fn all_traits_are_object_safe() {
        fn _assert_provider(_: &dyn ProviderAdapter) {}
        fn _assert_embedding(_: &dyn EmbeddingAdapter) {}
        fn _assert_plugin(_: &dyn PluginAdapter) {}
    }
}
