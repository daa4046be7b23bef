//! SQLite persistence.
//!
//! Four tables: `chats`, `unanswered`, `scans` and `settings`. Metadata,
//! findings and non-string settings are stored as JSON text; string settings
//! are stored raw so other tools can read them without decoding.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::model::{
    ChatMessage, Metadata, ScanLog, ScanStatus, ScanUpdate, Sender, UnansweredQuestion,
    UnansweredStatus,
};
use crate::persistence::Persistence;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS chats (
        id INTEGER PRIMARY KEY,
        created_at TEXT NOT NULL,
        session_id TEXT NOT NULL,
        sender TEXT NOT NULL,
        message TEXT NOT NULL,
        meta TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_chats_session ON chats(session_id);

    CREATE TABLE IF NOT EXISTS unanswered (
        id INTEGER PRIMARY KEY,
        created_at TEXT NOT NULL,
        question TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        answer TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_unanswered_status ON unanswered(status);

    CREATE TABLE IF NOT EXISTS scans (
        id INTEGER PRIMARY KEY,
        started_at TEXT NOT NULL,
        ended_at TEXT,
        status TEXT NOT NULL,
        findings TEXT
    );

    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT
    );
";

/// Persistence backed by a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }

        info!("Opening database at: {}", path.display());
        let conn = Connection::open(path)?;

        // WAL keeps readers off the writer's lock
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::with_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        debug!("Database schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn invalid(column: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        Type::Text,
        format!("unexpected value {value:?}").into(),
    )
}

fn chat_from_row(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    let sender: String = row.get(3)?;
    let meta: Option<String> = row.get(5)?;
    Ok(ChatMessage {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        session_id: row.get(2)?,
        sender: Sender::parse(&sender).ok_or_else(|| invalid(3, &sender))?,
        text: row.get(4)?,
        metadata: meta
            .and_then(|meta| serde_json::from_str::<Metadata>(&meta).ok())
            .unwrap_or_default(),
    })
}

fn unanswered_from_row(row: &Row<'_>) -> rusqlite::Result<UnansweredQuestion> {
    let status: String = row.get(3)?;
    Ok(UnansweredQuestion {
        id: row.get(0)?,
        created_at: row.get(1)?,
        question: row.get(2)?,
        status: UnansweredStatus::parse(&status).ok_or_else(|| invalid(3, &status))?,
        answer: row.get(4)?,
    })
}

fn scan_from_row(row: &Row<'_>) -> rusqlite::Result<ScanLog> {
    let status: String = row.get(3)?;
    let findings: Option<String> = row.get(4)?;
    Ok(ScanLog {
        id: row.get(0)?,
        started_at: row.get(1)?,
        ended_at: row.get(2)?,
        status: ScanStatus::parse(&status).ok_or_else(|| invalid(3, &status))?,
        findings: findings
            .and_then(|findings| serde_json::from_str(&findings).ok())
            .unwrap_or_else(|| Value::Object(Metadata::new())),
    })
}

impl Persistence for SqliteStore {
    fn append_chat_message(
        &self,
        session_id: &str,
        sender: Sender,
        text: &str,
        metadata: Metadata,
    ) -> Result<ChatMessage> {
        let meta = serde_json::to_string(&metadata)?;
        let timestamp = Utc::now();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO chats (created_at, session_id, sender, message, meta)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![timestamp, session_id, sender.as_str(), text, meta],
        )?;
        Ok(ChatMessage {
            id: conn.last_insert_rowid(),
            timestamp,
            session_id: session_id.to_string(),
            sender,
            text: text.to_string(),
            metadata,
        })
    }

    fn list_recent_chats(&self, limit: usize) -> Result<Vec<ChatMessage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, created_at, session_id, sender, message, meta
             FROM chats ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![sql_limit(limit)], chat_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn chat_history(&self, session_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM (
                 SELECT id, created_at, session_id, sender, message, meta
                 FROM chats WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2
             ) ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![session_id, sql_limit(limit)], chat_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn enqueue_unanswered(&self, question: &str) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO unanswered (created_at, question, status) VALUES (?1, ?2, ?3)",
            params![Utc::now(), question, UnansweredStatus::Pending.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_pending_unanswered(&self, limit: usize) -> Result<Vec<UnansweredQuestion>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, created_at, question, status, answer
             FROM unanswered WHERE status = ?1 ORDER BY id ASC LIMIT ?2",
        )?;
        let rows = stmt.query_map(
            params![UnansweredStatus::Pending.as_str(), sql_limit(limit)],
            unanswered_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn mark_unanswered_answered(&self, id: i64, answer: &str) -> Result<()> {
        let changed = self.conn().execute(
            "UPDATE unanswered SET status = ?1, answer = ?2 WHERE id = ?3 AND status = ?4",
            params![
                UnansweredStatus::Answered.as_str(),
                answer,
                id,
                UnansweredStatus::Pending.as_str()
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "pending question",
                id,
            });
        }
        Ok(())
    }

    fn get_setting(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<Option<String>> = self
            .conn()
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw
            .flatten()
            .map(|raw| serde_json::from_str(&raw).unwrap_or(Value::String(raw))))
    }

    fn set_setting(&self, key: &str, value: Value) -> Result<()> {
        let stored = match value {
            Value::String(raw) => raw,
            other => serde_json::to_string(&other)?,
        };
        self.conn().execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, stored],
        )?;
        Ok(())
    }

    fn add_scan_log(&self, status: ScanStatus, findings: Value) -> Result<i64> {
        let findings = serde_json::to_string(&findings)?;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO scans (started_at, status, findings) VALUES (?1, ?2, ?3)",
            params![Utc::now(), status.as_str(), findings],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_scan_log(&self, id: i64, update: ScanUpdate) -> Result<()> {
        let findings = update
            .findings
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let changed = self.conn().execute(
            "UPDATE scans SET
                status = COALESCE(?1, status),
                findings = COALESCE(?2, findings),
                ended_at = COALESCE(?3, ended_at)
             WHERE id = ?4",
            params![
                update.status.map(ScanStatus::as_str),
                findings,
                update.ended_at,
                id
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { kind: "scan", id });
        }
        Ok(())
    }

    fn recent_scans(&self, limit: usize) -> Result<Vec<ScanLog>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, started_at, ended_at, status, findings
             FROM scans ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![sql_limit(limit)], scan_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
