// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible APIs.
//!
//! [`OpenAiClient`] handles authentication, JSON request/response handling,
//! and a single retry on transient status codes. Adapters built on it map
//! [`ClientError`] into the engine's error taxonomy.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::ApiErrorResponse;

/// Default base URL for the OpenAI API.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Failures talking to the API, before they are classified by an adapter.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The hosted OpenAI API was targeted without a key.
    #[error("no API key configured for {0}")]
    MissingApiKey(String),

    /// Transport-level failure (DNS, TLS, connection reset, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body did not match the expected schema.
    #[error("failed to parse API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Shared HTTP client for completion and embedding adapters.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    has_api_key: bool,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenAiClient {
    /// Creates a new client.
    ///
    /// `api_key` of `None` falls back to `OPENAI_API_KEY`. Servers other than
    /// the hosted OpenAI API (Ollama, vLLM, LM Studio) may run without a key.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let api_key = api_key.or_else(|| std::env::var("OPENAI_API_KEY").ok());

        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        if let Some(key) = &api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                ClientError::Api {
                    status: 0,
                    message: format!("invalid API key header value: {e}"),
                }
            })?;
            headers.insert("authorization", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            has_api_key: api_key.is_some(),
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Overrides the delay between retry attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Returns the base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// True when requests would reach the hosted API without credentials.
    pub fn missing_required_key(&self) -> bool {
        !self.has_api_key && self.base_url.starts_with(OPENAI_BASE_URL)
    }

    /// POSTs `body` as JSON to `{base_url}{path}` and decodes the response.
    ///
    /// On transient errors (429, 500, 502, 503), retries once after the retry delay.
    pub async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, ClientError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        if self.missing_required_key() {
            return Err(ClientError::MissingApiKey(self.base_url.clone()));
        }

        let url = format!("{}{}", self.base_url, path);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, path, "retrying request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self.client.post(&url).json(body).send().await?;
            let status = response.status();
            debug!(status = %status, attempt, path, "response received");

            if status.is_success() {
                let text = response.text().await?;
                return Ok(serde_json::from_str(&text)?);
            }

            let text = response.text().await.unwrap_or_default();
            let error = ClientError::Api {
                status: status.as_u16(),
                message: describe_error_body(&text),
            };

            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %text, "transient error, will retry");
                last_error = Some(error);
                continue;
            }

            return Err(error);
        }

        Err(last_error.unwrap_or_else(|| ClientError::Api {
            status: 0,
            message: "request failed after retries".to_string(),
        }))
    }
}

/// Pull the human-readable message out of an error envelope if there is one.
fn describe_error_body(body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => match api_err.error.type_ {
            Some(kind) => format!("{kind}: {}", api_err.error.message),
            None => api_err.error.message,
        },
        Err(_) => body.to_string(),
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}
