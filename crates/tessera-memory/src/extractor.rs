// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-based fact extraction.
//!
//! One completion call per input text. The response is parsed leniently:
//! markdown fences and surrounding prose are tolerated, and individual
//! malformed facts are skipped rather than failing the whole batch.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tessera_core::types::{AdapterType, HealthStatus, ProviderMessage, ProviderRequest};
use tessera_core::{PluginAdapter, ProviderAdapter, TesseraError};
use tracing::{debug, warn};

use crate::traits::FactExtractor;
use crate::types::{Entity, Fact, FactNetwork, Relationship};

/// System prompt for fact extraction.
const EXTRACTION_PROMPT: &str = r#"You extract atomic facts from text for a long-term memory store.

Return a JSON object of the form {"facts": [...]}. Each fact has:
- "network": one of "world_fact" (general truths), "experience" (things the agent did or observed), "entity_summary" (knowledge about a named entity), "belief" (an opinion or preference)
- "statement": the fact as one standalone sentence
- "entities": list of {"name": ..., "type": ...} referenced by the fact
- "relationships": list of {"from": ..., "to": ..., "type": ...} between those entities
- "confidence": number between 0 and 1

If the text holds no facts, return {"facts": []}. Output JSON only."#;

/// Fact as returned by the model, before validation.
#[derive(Debug, Deserialize)]
struct RawFact {
    #[serde(default)]
    network: String,
    #[serde(default)]
    statement: String,
    #[serde(default)]
    entities: Vec<Entity>,
    #[serde(default)]
    relationships: Vec<Relationship>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// [`FactExtractor`] backed by a completion provider.
pub struct LlmFactExtractor {
    provider: Arc<dyn ProviderAdapter>,
    model: String,
    max_tokens: u32,
}

impl LlmFactExtractor {
    /// Creates an extractor. An empty `model` defers to the provider's default.
    pub fn new(provider: Arc<dyn ProviderAdapter>, model: String, max_tokens: u32) -> Self {
        Self {
            provider,
            model,
            max_tokens,
        }
    }
}

#[async_trait]
impl PluginAdapter for LlmFactExtractor {
    fn name(&self) -> &str {
        "llm-extractor"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Extractor
    }

    async fn health_check(&self) -> Result<HealthStatus, TesseraError> {
        self.provider.health_check().await
    }

    async fn shutdown(&self) -> Result<(), TesseraError> {
        Ok(())
    }
}

#[async_trait]
impl FactExtractor for LlmFactExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<Fact>, TesseraError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            system_prompt: Some(EXTRACTION_PROMPT.to_string()),
            messages: vec![ProviderMessage::user(text)],
            max_tokens: self.max_tokens,
            temperature: Some(0.0),
        };

        let response = self.provider.complete(request).await?;
        debug!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "extraction response received"
        );
        parse_extraction_response(&response.content)
    }
}

/// Parse a model response into validated facts.
///
/// Accepts `{"facts": [...]}`, a bare array, either wrapped in a markdown code
/// block, or an array embedded in prose. A response with no recognizable JSON
/// array is an [`TesseraError::Extraction`] error.
pub fn parse_extraction_response(response: &str) -> Result<Vec<Fact>, TesseraError> {
    let raw = locate_fact_array(response).ok_or_else(|| {
        debug!(response, "unparseable extraction response");
        TesseraError::Extraction("response contained no JSON fact array".to_string())
    })?;

    Ok(raw.into_iter().filter_map(validate_fact).collect())
}

fn locate_fact_array(response: &str) -> Option<Vec<serde_json::Value>> {
    let trimmed = strip_code_fence(response.trim());

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        match value {
            serde_json::Value::Array(items) => return Some(items),
            serde_json::Value::Object(mut map) => {
                if let Some(serde_json::Value::Array(items)) = map.remove("facts") {
                    return Some(items);
                }
            }
            _ => {}
        }
    }

    // Fall back to the outermost bracketed span.
    let start = trimmed.find('[')?;
    let end = trimmed.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line.
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn validate_fact(value: serde_json::Value) -> Option<Fact> {
    let raw: RawFact = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "skipping malformed fact");
            return None;
        }
    };

    let statement = raw.statement.trim();
    if statement.is_empty() {
        warn!("skipping fact with empty statement");
        return None;
    }

    let network = match FactNetwork::from_str(raw.network.trim()) {
        Ok(network) => network,
        Err(_) => {
            warn!(network = %raw.network, statement, "skipping fact with unknown network");
            return None;
        }
    };

    let confidence = match raw.confidence {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        Some(_) => 0.0,
        None => 1.0,
    };

    Some(Fact {
        network,
        statement: statement.to_string(),
        entities: raw
            .entities
            .into_iter()
            .filter(|e| !e.name.trim().is_empty())
            .collect(),
        relationships: raw.relationships,
        confidence,
    })
}
