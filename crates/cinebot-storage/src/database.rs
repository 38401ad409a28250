// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All access is serialized through tokio-rusqlite's single background thread.
//! The [`Database`] handle is passed explicitly to every query function; do
//! not open additional connections for writes.

use std::path::Path;
use std::time::Duration;

use cinebot_core::CinebotError;
use rusqlite::functions::FunctionFlags;
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// Busy timeout used when the caller has no configuration at hand.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Maps a tokio-rusqlite call error into the workspace error type.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CinebotError {
    CinebotError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the Cinebot SQLite database.
///
/// Cheap to clone; every clone talks to the same background connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database file, apply PRAGMAs, register SQL
    /// functions, and run pending migrations.
    pub async fn open(path: impl AsRef<Path>, busy_timeout_ms: u64) -> Result<Self, CinebotError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CinebotError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| CinebotError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(busy_timeout_ms).await?;
        info!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Open a private in-memory database. Used by tests.
    pub async fn open_in_memory() -> Result<Self, CinebotError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| CinebotError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(DEFAULT_BUSY_TIMEOUT_MS).await?;
        Ok(db)
    }

    async fn prepare(&self, busy_timeout_ms: u64) -> Result<(), CinebotError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;
                conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
                register_functions(conn)?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        self.conn
            .call(|conn| -> Result<Result<(), CinebotError>, rusqlite::Error> {
                Ok(run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)??;
        debug!("migrations applied");
        Ok(())
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), CinebotError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(|e| CinebotError::Storage {
            source: Box::new(e),
        })?;
        debug!("database closed");
        Ok(())
    }
}

/// Registers `casefold(text)`: a deterministic Unicode lowercase used for
/// case-insensitive substring matching (`instr(casefold(a), casefold(b)) > 0`).
/// SQLite's built-in `lower()` only folds ASCII, which misses Vietnamese titles.
fn register_functions(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}
