// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat completion adapter used for fact extraction.

use std::time::Duration;

use async_trait::async_trait;
use tessera_config::model::ExtractionConfig;
use tessera_core::types::{AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage};
use tessera_core::{PluginAdapter, ProviderAdapter, TesseraError};

use crate::client::{ClientError, OpenAiClient};
use crate::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ResponseFormat};

/// [`ProviderAdapter`] over an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiProvider {
    client: OpenAiClient,
    default_model: String,
    json_mode: bool,
}

impl OpenAiProvider {
    /// Creates a provider from an existing client.
    pub fn new(client: OpenAiClient, default_model: String) -> Self {
        Self {
            client,
            default_model,
            json_mode: true,
        }
    }

    /// Builds a provider from the `[extraction]` config section.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, TesseraError> {
        let client = OpenAiClient::new(
            &config.base_url,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
        .map_err(provider_err)?;
        Ok(Self::new(client, config.model.clone()))
    }

    /// Disables `response_format: json_object`, for servers that reject it.
    pub fn without_json_mode(mut self) -> Self {
        self.json_mode = false;
        self
    }

    fn build_request(&self, request: ProviderRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: Some(system),
            });
        }
        messages.extend(request.messages.into_iter().map(|m| ChatMessage {
            role: m.role,
            content: Some(m.content),
        }));

        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model
        };

        ChatCompletionRequest {
            model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: self.json_mode.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }
}

fn provider_err(e: ClientError) -> TesseraError {
    TesseraError::Provider {
        message: e.to_string(),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai-chat"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
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
impl ProviderAdapter for OpenAiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, TesseraError> {
        let body = self.build_request(request);
        let response: ChatCompletionResponse = self
            .client
            .post_json("/chat/completions", &body)
            .await
            .map_err(provider_err)?;

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            TesseraError::Provider {
                message: "completion returned no choices".to_string(),
                source: None,
            }
        })?;

        Ok(ProviderResponse {
            id: response.id,
            content: choice.message.content.unwrap_or_default(),
            model: response.model,
            stop_reason: choice.finish_reason,
            usage: TokenUsage {
                input_tokens: response.usage.prompt_tokens,
                output_tokens: response.usage.completion_tokens,
            },
        })
    }
}
