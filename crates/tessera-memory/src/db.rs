// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared SQLite connection helpers for the vector and graph stores.

use std::path::Path;

use tessera_core::TesseraError;
use tokio_rusqlite::Connection;

/// Map a tokio-rusqlite error into [`TesseraError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TesseraError {
    TesseraError::Storage {
        source: Box::new(e),
    }
}

/// Map a serde_json error on stored columns into [`TesseraError::Storage`].
pub(crate) fn map_json_err(e: serde_json::Error) -> TesseraError {
    TesseraError::Storage {
        source: Box::new(e),
    }
}

/// Open a database file, creating parent directories and enabling WAL if asked.
pub async fn open_database(path: &str, wal_mode: bool) -> Result<Connection, TesseraError> {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| TesseraError::Storage {
                source: Box::new(e),
            })?;
    }

    let conn = Connection::open(path)
        .await
        .map_err(|e| TesseraError::Storage {
            source: Box::new(e),
        })?;

    conn.call(move |conn| -> Result<(), rusqlite::Error> {
        if wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        Ok(())
    })
    .await
    .map_err(map_tr_err)?;

    Ok(conn)
}

/// Open a private in-memory database.
pub async fn open_in_memory() -> Result<Connection, TesseraError> {
    Connection::open_in_memory()
        .await
        .map_err(|e| TesseraError::Storage {
            source: Box::new(e),
        })
}

/// Parse a stored RFC 3339 timestamp, falling back to the Unix epoch.
pub(crate) fn parse_timestamp(value: &str) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&chrono::Utc))
        .unwrap_or_default()
}
