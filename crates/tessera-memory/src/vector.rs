// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed vector store with BLOB embeddings and brute-force cosine search.

use std::sync::Arc;

use async_trait::async_trait;
use tessera_core::types::{AdapterType, EmbeddingInput, HealthStatus};
use tessera_core::{EmbeddingAdapter, PluginAdapter, TesseraError};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::db::{map_json_err, map_tr_err, open_database, open_in_memory, parse_timestamp};
use crate::traits::{ItemPredicate, VectorStore};
use crate::types::{
    MemoryItem, Metadata, SearchResult, blob_to_vec, cosine_similarity, vec_to_blob,
};

/// Metadata key whose string value becomes the item id when present.
pub const WRITE_ID_KEY: &str = "writeId";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS memory_items (
        id TEXT PRIMARY KEY NOT NULL,
        text TEXT NOT NULL,
        metadata TEXT NOT NULL DEFAULT '{}',
        embedding BLOB NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_memory_items_created ON memory_items(created_at);";

/// Raw row as read from `memory_items`, decoded outside the connection thread.
type ItemRow = (String, String, String, Vec<u8>, String);

/// Persistent vector store.
///
/// Text is embedded through the injected [`EmbeddingAdapter`] on both write and
/// query. Similarity search loads every embedding and scores it in memory.
pub struct SqliteVectorStore {
    conn: Connection,
    embedder: Arc<dyn EmbeddingAdapter>,
}

impl SqliteVectorStore {
    /// Wraps an existing connection and creates the schema if missing.
    pub async fn new(
        conn: Connection,
        embedder: Arc<dyn EmbeddingAdapter>,
    ) -> Result<Self, TesseraError> {
        conn.call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch(SCHEMA) })
            .await
            .map_err(map_tr_err)?;
        Ok(Self { conn, embedder })
    }

    /// Opens (or creates) a store at `path`.
    pub async fn open(
        path: &str,
        wal_mode: bool,
        embedder: Arc<dyn EmbeddingAdapter>,
    ) -> Result<Self, TesseraError> {
        let conn = open_database(path, wal_mode).await?;
        Self::new(conn, embedder).await
    }

    /// Opens a store over a private in-memory database.
    pub async fn open_in_memory(embedder: Arc<dyn EmbeddingAdapter>) -> Result<Self, TesseraError> {
        let conn = open_in_memory().await?;
        Self::new(conn, embedder).await
    }

    /// Fetch a single item by id.
    pub async fn get(&self, id: &str) -> Result<Option<MemoryItem>, TesseraError> {
        let id = id.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<ItemRow>, rusqlite::Error> {
                let result = conn.query_row(
                    "SELECT id, text, metadata, embedding, created_at FROM memory_items WHERE id = ?1",
                    rusqlite::params![id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
                );
                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(map_tr_err)?;

        row.map(|r| decode_row(r).map(|(item, _)| item)).transpose()
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, TesseraError> {
        let output = self
            .embedder
            .embed(EmbeddingInput::single(text))
            .await
            .map_err(as_embedding_error)?;
        output
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| TesseraError::Embedding {
                message: "embedding returned no vector".to_string(),
                source: None,
            })
    }

    async fn load_all(&self) -> Result<Vec<(MemoryItem, Vec<f32>)>, TesseraError> {
        let rows = self
            .conn
            .call(|conn| -> Result<Vec<ItemRow>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, text, metadata, embedding, created_at FROM memory_items",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)?;

        rows.into_iter().map(decode_row).collect()
    }
}

/// Any failure on the embedding path is reported as an embedding error.
fn as_embedding_error(e: TesseraError) -> TesseraError {
    if e.is_embedding() {
        return e;
    }
    TesseraError::Embedding {
        message: e.to_string(),
        source: Some(Box::new(e)),
    }
}

fn decode_row(row: ItemRow) -> Result<(MemoryItem, Vec<f32>), TesseraError> {
    let (id, text, metadata, blob, created_at) = row;
    let metadata: Metadata = serde_json::from_str(&metadata).map_err(map_json_err)?;
    Ok((
        MemoryItem {
            id,
            text,
            metadata,
            timestamp: parse_timestamp(&created_at),
        },
        blob_to_vec(&blob),
    ))
}

/// Score candidates against `query`, drop those below `threshold`, and keep
/// the best `top_k` in descending score order.
///
/// Candidates whose dimensionality differs from the query are skipped.
pub fn rank_candidates(
    query: &[f32],
    candidates: Vec<(MemoryItem, Vec<f32>)>,
    top_k: usize,
    threshold: f32,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = candidates
        .into_iter()
        .filter(|(_, emb)| emb.len() == query.len())
        .map(|(item, emb)| SearchResult {
            score: cosine_similarity(query, &emb),
            item,
        })
        .filter(|r| r.score >= threshold)
        .collect();

    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(top_k);
    results
}

#[async_trait]
impl PluginAdapter for SqliteVectorStore {
    fn name(&self) -> &str {
        "sqlite-vector"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::VectorStore
    }

    async fn health_check(&self) -> Result<HealthStatus, TesseraError> {
        let db = self
            .conn
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT 1", [], |row| row.get(0))
            })
            .await;
        if let Err(e) = db {
            return Ok(HealthStatus::Unhealthy(format!("database: {e}")));
        }

        match self.embedder.health_check().await? {
            HealthStatus::Healthy => Ok(HealthStatus::Healthy),
            HealthStatus::Degraded(detail) | HealthStatus::Unhealthy(detail) => Ok(
                HealthStatus::Degraded(format!("embedder {}: {detail}", self.embedder.name())),
            ),
        }
    }

    async fn shutdown(&self) -> Result<(), TesseraError> {
        self.close().await
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn remember(&self, text: &str, metadata: Metadata) -> Result<String, TesseraError> {
        let embedding = self.embed_one(text).await?;

        let id = metadata
            .get(WRITE_ID_KEY)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let metadata_json = serde_json::to_string(&metadata).map_err(map_json_err)?;
        let blob = vec_to_blob(&embedding);
        let text = text.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        let item_id = id.clone();

        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO memory_items (id, text, metadata, embedding, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![item_id, text, metadata_json, blob, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        debug!(id = %id, dimensions = embedding.len(), "memory item stored");
        Ok(id)
    }

    async fn recall(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>, TesseraError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self.embed_one(query).await?;
        let candidates = self.load_all().await?;
        let scanned = candidates.len();
        let results = rank_candidates(&query_vec, candidates, top_k, threshold);
        debug!(scanned, returned = results.len(), threshold, "vector recall");
        Ok(results)
    }

    async fn forget(&self, id: &str) -> Result<bool, TesseraError> {
        let id = id.to_string();
        let deleted = self
            .conn
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "DELETE FROM memory_items WHERE id = ?1",
                    rusqlite::params![id],
                )
            })
            .await
            .map_err(map_tr_err)?;
        Ok(deleted > 0)
    }

    async fn forget_all(&self, predicate: Option<&ItemPredicate>) -> Result<usize, TesseraError> {
        let Some(predicate) = predicate else {
            return self
                .conn
                .call(|conn| -> Result<usize, rusqlite::Error> {
                    conn.execute("DELETE FROM memory_items", [])
                })
                .await
                .map_err(map_tr_err);
        };

        let ids: Vec<String> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|(item, _)| predicate(item))
            .map(|(item, _)| item.id)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        self.conn
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                let tx = conn.transaction()?;
                let mut deleted = 0;
                {
                    let mut stmt = tx.prepare("DELETE FROM memory_items WHERE id = ?1")?;
                    for id in &ids {
                        deleted += stmt.execute(rusqlite::params![id])?;
                    }
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn count(&self) -> Result<usize, TesseraError> {
        let count = self
            .conn
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM memory_items", [], |row| row.get(0))
            })
            .await
            .map_err(map_tr_err)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn close(&self) -> Result<(), TesseraError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)
    }
}
