// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible adapters for the Tessera memory engine.
//!
//! - [`OpenAiProvider`]: chat completion, used by the fact extractor
//! - [`OpenAiEmbedder`]: text embeddings, used by the vector store
//!
//! Both speak the OpenAI wire format, so they also work against Ollama,
//! vLLM, and other servers exposing the same endpoints.

pub mod client;
pub mod embedder;
pub mod provider;
pub mod types;

pub use client::{ClientError, OpenAiClient};
pub use embedder::OpenAiEmbedder;
pub use provider::OpenAiProvider;
