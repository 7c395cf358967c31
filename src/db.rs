use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{SaveError, StoreError};
use crate::progress::{ProgressSink, SaveRequest};
use crate::review::{ReviewState, VocabularyStore};

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEntry {
    pub user_id: String,
    pub episode_id: String,
    pub progress_seconds: u32,
    pub is_finished: bool,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyEntry {
    pub id: i64,
    pub word: String,
    pub translation: String,
    pub proficiency: u32,
    pub next_review_at: String,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS playback_progress (
                user_id TEXT NOT NULL,
                episode_id TEXT NOT NULL,
                progress_seconds INTEGER NOT NULL,
                is_finished INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, episode_id)
            );
            CREATE INDEX IF NOT EXISTS idx_playback_progress_updated ON playback_progress(updated_at DESC);

            CREATE TABLE IF NOT EXISTS vocabulary (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                word TEXT NOT NULL,
                translation TEXT NOT NULL,
                proficiency INTEGER NOT NULL DEFAULT 0,
                next_review_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_vocabulary_due ON vocabulary(next_review_at);
            "#,
        )?;
        Ok(())
    }

    /// Upsert keyed by (user, episode). Keeps the furthest position and never clears
    /// the finished flag, so replays of older or duplicate saves are harmless.
    pub fn save_progress(
        &self,
        user_id: &str,
        episode_id: &str,
        progress_seconds: u32,
        is_finished: bool,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO playback_progress (user_id, episode_id, progress_seconds, is_finished, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id, episode_id) DO UPDATE SET
                progress_seconds = MAX(progress_seconds, excluded.progress_seconds),
                is_finished = MAX(is_finished, excluded.is_finished),
                updated_at = excluded.updated_at
            "#,
            params![
                user_id,
                episode_id,
                progress_seconds,
                is_finished,
                timestamp(Utc::now())
            ],
        )?;
        Ok(())
    }

    pub fn load_progress(&self, user_id: &str, episode_id: &str) -> Result<Option<ProgressEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT user_id, episode_id, progress_seconds, is_finished, updated_at FROM playback_progress WHERE user_id = ?1 AND episode_id = ?2",
                params![user_id, episode_id],
                progress_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn list_progress(&self, user_id: &str) -> Result<Vec<ProgressEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, episode_id, progress_seconds, is_finished, updated_at FROM playback_progress WHERE user_id = ?1 ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], progress_from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn add_vocabulary(&self, word: &str, translation: &str, now: DateTime<Utc>) -> Result<i64> {
        let now = timestamp(now);
        self.conn.execute(
            "INSERT INTO vocabulary (word, translation, proficiency, next_review_at, created_at) VALUES (?1, ?2, 0, ?3, ?3)",
            params![word.trim(), translation.trim(), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn vocabulary(&self, id: i64) -> Result<VocabularyEntry> {
        self.conn
            .query_row(
                "SELECT id, word, translation, proficiency, next_review_at FROM vocabulary WHERE id = ?1",
                params![id],
                vocabulary_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("vocabulary {id}")))
    }

    pub fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<VocabularyEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, word, translation, proficiency, next_review_at FROM vocabulary WHERE next_review_at <= ?1 ORDER BY next_review_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![timestamp(now)], vocabulary_from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl VocabularyStore for Database {
    fn load_proficiency(&self, vocabulary_id: i64) -> Result<u32> {
        let level: Option<i64> = self
            .conn
            .query_row(
                "SELECT proficiency FROM vocabulary WHERE id = ?1",
                params![vocabulary_id],
                |row| row.get(0),
            )
            .optional()?;
        let level =
            level.ok_or_else(|| StoreError::NotFound(format!("vocabulary {vocabulary_id}")))?;
        u32::try_from(level)
            .map_err(|_| StoreError::Invalid(format!("proficiency {level} for {vocabulary_id}")))
    }

    fn save_review_state(&self, vocabulary_id: i64, state: &ReviewState) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE vocabulary SET proficiency = ?1, next_review_at = ?2 WHERE id = ?3",
            params![state.proficiency, timestamp(state.next_review_at), vocabulary_id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("vocabulary {vocabulary_id}")));
        }
        Ok(())
    }
}

/// Persists tracker saves for one user through a shared connection.
#[derive(Clone)]
pub struct DbProgressSink {
    db: Arc<Mutex<Database>>,
    user_id: String,
}

impl DbProgressSink {
    pub fn new(db: Arc<Mutex<Database>>, user_id: &str) -> Self {
        Self {
            db,
            user_id: user_id.to_string(),
        }
    }
}

impl ProgressSink for DbProgressSink {
    fn save(&self, request: &SaveRequest) -> std::result::Result<(), SaveError> {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        db.save_progress(
            &self.user_id,
            &request.episode_id,
            request.progress_seconds,
            request.is_finished,
        )?;
        Ok(())
    }
}

// Fixed-width UTC timestamps so TEXT ordering matches time ordering.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn progress_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProgressEntry> {
    Ok(ProgressEntry {
        user_id: row.get(0)?,
        episode_id: row.get(1)?,
        progress_seconds: row.get(2)?,
        is_finished: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn vocabulary_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<VocabularyEntry> {
    Ok(VocabularyEntry {
        id: row.get(0)?,
        word: row.get(1)?,
        translation: row.get(2)?,
        proficiency: row.get(3)?,
        next_review_at: row.get(4)?,
    })
}
