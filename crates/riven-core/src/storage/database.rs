//! SQLite-backed local storage.
//!
//! Provides persistent storage for:
//! - A key-value store holding the streak payload per user
//! - A log of recorded study events

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::DatabaseError;
use crate::events::StudyOutcome;

/// One row of the study log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyLogEntry {
    pub id: i64,
    pub user: String,
    pub outcome: StudyOutcome,
    pub streak_after: u32,
    pub studied_at: DateTime<Utc>,
}

/// SQLite database for local streak storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/riven.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, crate::error::CoreError> {
        let path = data_dir()?.join("riven.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS study_log (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                user         TEXT NOT NULL,
                outcome      TEXT NOT NULL,
                streak_after INTEGER NOT NULL,
                studied_at   TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_study_log_user_at ON study_log(user, studied_at);",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Append a study event to the log.
    pub fn record_study(
        &self,
        user: &str,
        outcome: StudyOutcome,
        streak_after: u32,
        studied_at: DateTime<Utc>,
    ) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO study_log (user, outcome, streak_after, studied_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user,
                outcome_str(outcome),
                streak_after,
                studied_at.to_rfc3339()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent study events for `user`, newest first.
    pub fn recent_studies(
        &self,
        user: &str,
        limit: usize,
    ) -> Result<Vec<StudyLogEntry>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user, outcome, streak_after, studied_at
             FROM study_log
             WHERE user = ?1
             ORDER BY studied_at DESC, id DESC
             LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![user, limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, user, outcome, streak_after, studied_at) = row?;
            let Some(outcome) = parse_outcome(&outcome) else {
                continue;
            };
            let Ok(studied_at) = DateTime::parse_from_rfc3339(&studied_at) else {
                continue;
            };
            entries.push(StudyLogEntry {
                id,
                user,
                outcome,
                streak_after,
                studied_at: studied_at.with_timezone(&Utc),
            });
        }
        Ok(entries)
    }
}

fn outcome_str(outcome: StudyOutcome) -> &'static str {
    match outcome {
        StudyOutcome::Refreshed => "refreshed",
        StudyOutcome::Started => "started",
        StudyOutcome::Extended => "extended",
    }
}

fn parse_outcome(raw: &str) -> Option<StudyOutcome> {
    match raw {
        "refreshed" => Some(StudyOutcome::Refreshed),
        "started" => Some(StudyOutcome::Started),
        "extended" => Some(StudyOutcome::Extended),
        _ => None,
    }
}
