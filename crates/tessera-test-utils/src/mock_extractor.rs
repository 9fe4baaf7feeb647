// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted fact extractors.

use std::collections::HashMap;

use async_trait::async_trait;
use tessera_core::types::{AdapterType, HealthStatus};
use tessera_core::{PluginAdapter, TesseraError};
use tessera_memory::{Fact, FactExtractor};
use tokio::sync::Mutex;

/// Extractor returning canned facts keyed by exact input text.
///
/// Unscripted inputs yield no facts.
#[derive(Default)]
pub struct ScriptedExtractor {
    script: HashMap<String, Vec<Fact>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `facts` whenever `text` is extracted.
    pub fn on(mut self, text: impl Into<String>, facts: Vec<Fact>) -> Self {
        self.script.insert(text.into(), facts);
        self
    }

    /// Inputs seen so far, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for ScriptedExtractor {
    fn name(&self) -> &str {
        "scripted-extractor"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Extractor
    }

    async fn health_check(&self) -> Result<HealthStatus, TesseraError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TesseraError> {
        Ok(())
    }
}

#[async_trait]
impl FactExtractor for ScriptedExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<Fact>, TesseraError> {
        self.calls.lock().await.push(text.to_string());
        Ok(self.script.get(text).cloned().unwrap_or_default())
    }
}

/// Extractor whose every call fails like an unreachable model.
#[derive(Debug, Default)]
pub struct FailingExtractor;

#[async_trait]
impl PluginAdapter for FailingExtractor {
    fn name(&self) -> &str {
        "failing-extractor"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Extractor
    }

    async fn health_check(&self) -> Result<HealthStatus, TesseraError> {
        Ok(HealthStatus::Unhealthy("model unreachable".to_string()))
    }

    async fn shutdown(&self) -> Result<(), TesseraError> {
        Ok(())
    }
}

#[async_trait]
impl FactExtractor for FailingExtractor {
    async fn extract(&self, _text: &str) -> Result<Vec<Fact>, TesseraError> {
        Err(TesseraError::Provider {
            message: "connection refused".to_string(),
            source: None,
        })
    }
}
