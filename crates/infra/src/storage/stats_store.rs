//! SQLite-backed stats store.
//!
//! Persists the lifetime sent-message counter and the last-sent timestamp
//! across agent restarts in a single key/value table. Access is serialized
//! behind a mutex; the scheduler guarantees at most one delivery cycle runs
//! at a time, so a single connection is sufficient.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use smsrelay_core::StatsStore;
use smsrelay_domain::constants::{STAT_LAST_SENT_AT, STAT_SENT_COUNT};
use smsrelay_domain::{RelayError, Result};
use tracing::debug;

/// SQLite stats store implementing the `StatsStore` port
pub struct SqliteStatsStore {
    conn: Mutex<Connection>,
}

impl SqliteStatsStore {
    /// Open (or create) the stats database at the given path
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Storage` if the database cannot be opened or the
    /// schema cannot be created
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(storage_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS stats (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .map_err(storage_err)?;

        debug!(path = %path.as_ref().display(), "Stats store opened");

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row("SELECT value FROM stats WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(storage_err)
    }

    fn put(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO stats (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )
        .map_err(storage_err)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RelayError::Storage("stats store mutex poisoned".into()))
    }
}

impl StatsStore for SqliteStatsStore {
    fn sent_count(&self) -> Result<u64> {
        match self.get(STAT_SENT_COUNT)? {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|err| RelayError::Storage(format!("corrupt sent counter: {err}"))),
            None => Ok(0),
        }
    }

    fn last_sent_at(&self) -> Result<Option<DateTime<Utc>>> {
        match self.get(STAT_LAST_SENT_AT)? {
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map(|at| Some(at.with_timezone(&Utc)))
                .map_err(|err| RelayError::Storage(format!("corrupt last-sent timestamp: {err}"))),
            None => Ok(None),
        }
    }

    fn record_sent(&self, at: DateTime<Utc>) -> Result<()> {
        let count = self.sent_count()?;
        let conn = self.lock()?;
        Self::put(&conn, STAT_SENT_COUNT, &(count + 1).to_string())?;
        Self::put(&conn, STAT_LAST_SENT_AT, &at.to_rfc3339())?;
        Ok(())
    }
}

fn storage_err(err: rusqlite::Error) -> RelayError {
    RelayError::Storage(err.to_string())
}
