// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured responses,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tessera_core::types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage,
};
use tessera_core::{PluginAdapter, ProviderAdapter, TesseraError};

/// A mock LLM provider that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty,
/// an empty fact list (`{"facts": []}`) is returned.
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<Result<String, String>>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with an empty response queue.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock provider pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Ok).collect())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response to the end of the queue.
    pub async fn add_response(&self, text: String) {
        self.responses.lock().await.push_back(Ok(text));
    }

    /// Queue an upstream failure.
    pub async fn add_error(&self, message: String) {
        self.responses.lock().await.push_back(Err(message));
    }

    /// Number of completion requests received.
    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Copies of every request received, in order.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_response(&self) -> Result<String, String> {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(r#"{"facts": []}"#.to_string()))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, TesseraError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TesseraError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, TesseraError> {
        let model = request.model.clone();
        self.requests.lock().await.push(request);

        match self.next_response().await {
            Ok(content) => Ok(ProviderResponse {
                id: format!("mock-{}", self.request_count().await),
                content,
                model,
                stop_reason: Some("stop".to_string()),
                usage: TokenUsage {
                    input_tokens: 10,
                    output_tokens: 5,
                },
            }),
            Err(message) => Err(TesseraError::Provider {
                message,
                source: None,
            }),
        }
    }
}
