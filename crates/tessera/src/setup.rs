// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine assembly from configuration.

use std::sync::Arc;

use tessera_config::TesseraConfig;
use tessera_core::TesseraError;
use tessera_memory::{
    EngineConfig, HeuristicDetector, LlmFactExtractor, MemoryEngine, SqliteGraphStore,
    SqliteVectorStore,
};
use tessera_openai::{OpenAiEmbedder, OpenAiProvider};
use tracing::{debug, info};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tessera={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Build a memory engine with every collaborator the config enables.
pub async fn build_engine(config: &TesseraConfig) -> Result<MemoryEngine, TesseraError> {
    let embedder = Arc::new(OpenAiEmbedder::from_config(&config.embedding)?);
    let vector_store = Arc::new(
        SqliteVectorStore::open(
            &config.storage.database_path,
            config.storage.wal_mode,
            embedder,
        )
        .await?,
    );
    debug!(path = %config.storage.database_path, "vector store opened");

    let mut builder = MemoryEngine::builder(vector_store).config(EngineConfig::from(&config.engine));

    if config.graph.enabled {
        let path = config.graph.resolved_path(&config.storage);
        let graph = SqliteGraphStore::open(path, config.storage.wal_mode).await?;
        builder = builder.graph_store(Arc::new(graph));
        debug!(path, "graph store opened");
    }

    if config.extraction.enabled {
        let provider = Arc::new(OpenAiProvider::from_config(&config.extraction)?);
        builder = builder.extractor(Arc::new(LlmFactExtractor::new(
            provider,
            config.extraction.model.clone(),
            config.extraction.max_tokens,
        )));
    }

    if config.contradiction.enabled {
        builder = builder.detector(Arc::new(HeuristicDetector::new(
            config.contradiction.min_overlap,
        )));
    }

    info!(
        graph = config.graph.enabled,
        extraction = config.extraction.enabled,
        contradiction = config.contradiction.enabled,
        "memory engine ready"
    );
    Ok(builder.build())
}
