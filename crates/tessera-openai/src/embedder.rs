// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter over an OpenAI-compatible `/embeddings` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use tessera_config::model::EmbeddingConfig;
use tessera_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use tessera_core::{EmbeddingAdapter, PluginAdapter, TesseraError};

use crate::client::{ClientError, OpenAiClient};
use crate::types::{EmbeddingRequest, EmbeddingResponse};

/// Remote embedding adapter.
///
/// Every failure, including a missing API key, surfaces as
/// [`TesseraError::Embedding`] so the vector store can report it distinctly.
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
    dimensions: Option<usize>,
}

impl OpenAiEmbedder {
    /// Creates an embedder from an existing client.
    pub fn new(client: OpenAiClient, model: String, dimensions: Option<usize>) -> Self {
        Self {
            client,
            model,
            dimensions,
        }
    }

    /// Builds an embedder from the `[embedding]` config section.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, TesseraError> {
        let client = OpenAiClient::new(
            &config.base_url,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
        .map_err(embedding_err)?;
        Ok(Self::new(client, config.model.clone(), config.dimensions))
    }
}

fn embedding_err(e: ClientError) -> TesseraError {
    TesseraError::Embedding {
        message: e.to_string(),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl PluginAdapter for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai-embeddings"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, TesseraError> {
        if self.client.missing_required_key() {
            return Ok(HealthStatus::Unhealthy("no API key configured".to_string()));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TesseraError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for OpenAiEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, TesseraError> {
        if input.texts.is_empty() {
            return Ok(EmbeddingOutput {
                embeddings: vec![],
                dimensions: self.dimensions.unwrap_or(0),
            });
        }

        let expected = input.texts.len();
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: input.texts,
            dimensions: self.dimensions,
        };

        let mut response: EmbeddingResponse = self
            .client
            .post_json("/embeddings", &request)
            .await
            .map_err(embedding_err)?;

        if response.data.len() != expected {
            return Err(TesseraError::Embedding {
                message: format!(
                    "expected {expected} embeddings, got {}",
                    response.data.len()
                ),
                source: None,
            });
        }

        // Servers may return entries out of order; `index` is authoritative.
        response.data.sort_by_key(|d| d.index);
        let dimensions = response.data.first().map_or(0, |d| d.embedding.len());
        if response.data.iter().any(|d| d.embedding.len() != dimensions) {
            return Err(TesseraError::Embedding {
                message: "embeddings have inconsistent dimensions".to_string(),
                source: None,
            });
        }

        Ok(EmbeddingOutput {
            embeddings: response.data.into_iter().map(|d| d.embedding).collect(),
            dimensions,
        })
    }
}
