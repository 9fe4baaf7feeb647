// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed graph store for episodes, entity links, and contradictions.

use async_trait::async_trait;
use tessera_core::types::{AdapterType, HealthStatus};
use tessera_core::{PluginAdapter, TesseraError};
use tokio_rusqlite::Connection;

use crate::db::{map_json_err, map_tr_err, open_database, open_in_memory, parse_timestamp};
use crate::traits::GraphStore;
use crate::types::{ConflictingStatement, Contradiction, Episode, EpisodeType, Winner};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS episodes (
        id TEXT PRIMARY KEY NOT NULL,
        timestamp TEXT NOT NULL,
        episode_type TEXT NOT NULL,
        summary TEXT NOT NULL,
        content TEXT NOT NULL,
        entities TEXT NOT NULL DEFAULT '[]',
        relationships TEXT NOT NULL DEFAULT '[]'
    );
    CREATE TABLE IF NOT EXISTS episode_entities (
        episode_id TEXT NOT NULL,
        entity_name TEXT NOT NULL,
        position INTEGER NOT NULL,
        PRIMARY KEY (episode_id, entity_name)
    );
    CREATE INDEX IF NOT EXISTS idx_episode_entities_name ON episode_entities(entity_name);
    CREATE TABLE IF NOT EXISTS contradictions (
        id TEXT PRIMARY KEY NOT NULL,
        detected_at TEXT NOT NULL,
        existing_statement TEXT NOT NULL,
        existing_source TEXT NOT NULL,
        existing_id TEXT,
        existing_timestamp TEXT,
        new_statement TEXT NOT NULL,
        new_source TEXT NOT NULL,
        new_id TEXT,
        new_timestamp TEXT,
        winner TEXT,
        reasoning TEXT
    );";

const EPISODE_COLUMNS: &str =
    "id, timestamp, episode_type, summary, content, entities, relationships";

type EpisodeRow = (String, String, String, String, String, String, String);

type ContradictionRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// Persistent graph store.
///
/// Episodes are keyed by write id, so re-upserting the same write is
/// idempotent. Entity links keep their first-link position.
pub struct SqliteGraphStore {
    conn: Connection,
}

impl SqliteGraphStore {
    /// Wraps an existing connection and creates the schema if missing.
    pub async fn new(conn: Connection) -> Result<Self, TesseraError> {
        conn.call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch(SCHEMA) })
            .await
            .map_err(graph_err)?;
        Ok(Self { conn })
    }

    /// Opens (or creates) a store at `path`.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, TesseraError> {
        Self::new(open_database(path, wal_mode).await?).await
    }

    /// Opens a store over a private in-memory database.
    pub async fn open_in_memory() -> Result<Self, TesseraError> {
        Self::new(open_in_memory().await?).await
    }

    /// Entity names linked to an episode, in link order.
    pub async fn episode_entities(&self, episode_id: &str) -> Result<Vec<String>, TesseraError> {
        let episode_id = episode_id.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT entity_name FROM episode_entities \
                     WHERE episode_id = ?1 ORDER BY position",
                )?;
                let names = stmt
                    .query_map(rusqlite::params![episode_id], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(graph_err)
    }

    /// Number of stored episodes.
    pub async fn episode_count(&self) -> Result<usize, TesseraError> {
        let count = self
            .conn
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM episodes", [], |row| row.get(0))
            })
            .await
            .map_err(graph_err)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// All recorded contradictions, oldest first.
    pub async fn contradictions(&self) -> Result<Vec<Contradiction>, TesseraError> {
        let rows = self
            .conn
            .call(|conn| -> Result<Vec<ContradictionRow>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, detected_at, existing_statement, existing_source, existing_id, \
                     existing_timestamp, new_statement, new_source, new_id, new_timestamp, \
                     winner, reasoning FROM contradictions ORDER BY detected_at, rowid",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                            row.get(7)?,
                            row.get(8)?,
                            row.get(9)?,
                            row.get(10)?,
                            row.get(11)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(graph_err)?;

        Ok(rows.into_iter().map(decode_contradiction).collect())
    }
}

fn graph_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TesseraError {
    let storage = map_tr_err(e);
    TesseraError::Graph {
        message: storage.to_string(),
        source: Some(Box::new(storage)),
    }
}

fn decode_episode(row: EpisodeRow) -> Result<Episode, TesseraError> {
    let (id, timestamp, episode_type, summary, content, entities, relationships) = row;
    let episode_type = episode_type
        .parse::<EpisodeType>()
        .map_err(|e| TesseraError::Storage {
            source: format!("episode {id}: unknown type `{episode_type}`: {e}").into(),
        })?;
    Ok(Episode {
        id,
        timestamp: parse_timestamp(&timestamp),
        episode_type,
        summary,
        content,
        entities: serde_json::from_str(&entities).map_err(map_json_err)?,
        relationships: serde_json::from_str(&relationships).map_err(map_json_err)?,
    })
}

fn decode_contradiction(row: ContradictionRow) -> Contradiction {
    let (
        id,
        detected_at,
        existing_statement,
        existing_source,
        existing_id,
        existing_timestamp,
        new_statement,
        new_source,
        new_id,
        new_timestamp,
        winner,
        reasoning,
    ) = row;
    Contradiction {
        id,
        detected_at: parse_timestamp(&detected_at),
        existing_fact: ConflictingStatement {
            statement: existing_statement,
            source: existing_source,
            id: existing_id,
            timestamp: existing_timestamp.as_deref().map(parse_timestamp),
        },
        new_fact: ConflictingStatement {
            statement: new_statement,
            source: new_source,
            id: new_id,
            timestamp: new_timestamp.as_deref().map(parse_timestamp),
        },
        winner: winner.and_then(|w| w.parse::<Winner>().ok()),
        reasoning,
    }
}

/// Escape `LIKE` wildcards so the query matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl PluginAdapter for SqliteGraphStore {
    fn name(&self) -> &str {
        "sqlite-graph"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::GraphStore
    }

    async fn health_check(&self) -> Result<HealthStatus, TesseraError> {
        match self.episode_count().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), TesseraError> {
        Ok(())
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn upsert_episode(&self, episode: &Episode) -> Result<(), TesseraError> {
        let id = episode.id.clone();
        let timestamp = episode.timestamp.to_rfc3339();
        let episode_type = episode.episode_type.to_string();
        let summary = episode.summary.clone();
        let content = episode.content.clone();
        let entities = serde_json::to_string(&episode.entities).map_err(map_json_err)?;
        let relationships = serde_json::to_string(&episode.relationships).map_err(map_json_err)?;

        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO episodes (id, timestamp, episode_type, summary, content, entities, relationships) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
                     ON CONFLICT(id) DO UPDATE SET \
                        timestamp = excluded.timestamp, \
                        episode_type = excluded.episode_type, \
                        summary = excluded.summary, \
                        content = excluded.content, \
                        entities = excluded.entities, \
                        relationships = excluded.relationships",
                    rusqlite::params![id, timestamp, episode_type, summary, content, entities, relationships],
                )?;
                Ok(())
            })
            .await
            .map_err(graph_err)
    }

    async fn link_episode_entity(
        &self,
        episode_id: &str,
        entity_name: &str,
    ) -> Result<(), TesseraError> {
        let episode_id = episode_id.to_string();
        let entity_name = entity_name.to_string();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO episode_entities (episode_id, entity_name, position) \
                     VALUES (?1, ?2, (SELECT COUNT(*) FROM episode_entities WHERE episode_id = ?1))",
                    rusqlite::params![episode_id, entity_name],
                )?;
                Ok(())
            })
            .await
            .map_err(graph_err)
    }

    async fn get_episodes_by_query(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Episode>, TesseraError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let pattern = like_pattern(query);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = format!(
            "SELECT {EPISODE_COLUMNS} FROM episodes \
             WHERE lower(summary) LIKE ?1 ESCAPE '\\' OR lower(content) LIKE ?1 ESCAPE '\\' \
             ORDER BY rowid LIMIT ?2"
        );

        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<EpisodeRow>, rusqlite::Error> {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params![pattern, limit], |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(graph_err)?;

        rows.into_iter().map(decode_episode).collect()
    }

    async fn upsert_contradiction(&self, record: &Contradiction) -> Result<(), TesseraError> {
        let record = record.clone();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO contradictions (id, detected_at, existing_statement, existing_source, \
                     existing_id, existing_timestamp, new_statement, new_source, new_id, new_timestamp, \
                     winner, reasoning) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
                     ON CONFLICT(id) DO UPDATE SET winner = excluded.winner, reasoning = excluded.reasoning",
                    rusqlite::params![
                        record.id,
                        record.detected_at.to_rfc3339(),
                        record.existing_fact.statement,
                        record.existing_fact.source,
                        record.existing_fact.id,
                        record.existing_fact.timestamp.map(|t| t.to_rfc3339()),
                        record.new_fact.statement,
                        record.new_fact.source,
                        record.new_fact.id,
                        record.new_fact.timestamp.map(|t| t.to_rfc3339()),
                        record.winner.map(|w| w.to_string()),
                        record.reasoning,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(graph_err)
    }
}
