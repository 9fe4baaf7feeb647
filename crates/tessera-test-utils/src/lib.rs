// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tessera integration tests.
//!
//! Provides deterministic adapters and a [`TestHarness`] that assembles a
//! [`MemoryEngine`](tessera_memory::MemoryEngine) over temp-dir SQLite stores
//! without any network access.

pub mod harness;
pub mod mock_embedder;
pub mod mock_extractor;
pub mod mock_provider;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_embedder::{FailingEmbedder, MOCK_DIMENSIONS, MockEmbedder};
pub use mock_extractor::{FailingExtractor, ScriptedExtractor};
pub use mock_provider::MockProvider;
