//! SqliteBackingStore - message log in a single SQLite table.
//!
//! Every append runs in an `IMMEDIATE` transaction, which takes SQLite's
//! write lock up front. The stream version is read, checked, and the row
//! inserted under that lock, and `global_position` comes from
//! `AUTOINCREMENT` at insert time, so global order matches commit order.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use super::{BackingError, BackingStore, NO_STREAM_VERSION};
use crate::message::{stream_name, Fields, Message, NewMessage};

const CREATE_MESSAGES: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    global_position INTEGER PRIMARY KEY AUTOINCREMENT,
    id              TEXT NOT NULL UNIQUE,
    stream_name     TEXT NOT NULL,
    category        TEXT NOT NULL,
    type            TEXT NOT NULL,
    position        INTEGER NOT NULL,
    data            TEXT NOT NULL,
    metadata        TEXT,
    time_ms         INTEGER NOT NULL
)
"#;

const CREATE_STREAM_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS messages_stream
ON messages(stream_name, position)
"#;

const CREATE_CATEGORY_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS messages_category
ON messages(category, global_position)
"#;

const SELECT_COLUMNS: &str =
    "id, stream_name, type, position, global_position, data, metadata, time_ms";

/// Message log stored in SQLite.
///
/// Clone-friendly: clones share one connection behind a mutex.
#[derive(Clone)]
pub struct SqliteBackingStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackingStore {
    /// Open (or create) a database file and install the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BackingError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, BackingError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Open `path`, treating `":memory:"` as a private in-memory database.
    pub fn open_path(path: &str) -> Result<Self, BackingError> {
        if path == ":memory:" {
            Self::open_in_memory()
        } else {
            Self::open(path)
        }
    }

    pub fn from_connection(conn: Connection) -> Result<Self, BackingError> {
        install_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Connection) -> Result<T, BackingError>,
    ) -> Result<T, BackingError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| BackingError::LockPoisoned(operation))?;
        f(&mut conn)
    }
}

fn install_schema(conn: &Connection) -> Result<(), BackingError> {
    conn.execute_batch(&format!(
        "{};{};{};",
        CREATE_MESSAGES, CREATE_STREAM_INDEX, CREATE_CATEGORY_INDEX
    ))?;
    Ok(())
}

struct Row {
    id: String,
    stream_name: String,
    message_type: String,
    position: i64,
    global_position: i64,
    data: String,
    metadata: Option<String>,
    time_ms: i64,
}

impl Row {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
        Ok(Row {
            id: row.get(0)?,
            stream_name: row.get(1)?,
            message_type: row.get(2)?,
            position: row.get(3)?,
            global_position: row.get(4)?,
            data: row.get(5)?,
            metadata: row.get(6)?,
            time_ms: row.get(7)?,
        })
    }

    fn into_message(self) -> Result<Message, BackingError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| BackingError::Corrupt(format!("message id '{}': {}", self.id, e)))?;
        let data: Fields = serde_json::from_str(&self.data)?;
        let metadata: Fields = match self.metadata {
            Some(metadata) => serde_json::from_str(&metadata)?,
            None => Fields::new(),
        };
        Ok(Message {
            id,
            stream_name: self.stream_name,
            message_type: self.message_type,
            position: self.position,
            global_position: self.global_position,
            data,
            metadata,
            time: UNIX_EPOCH + Duration::from_millis(self.time_ms.max(0) as u64),
        })
    }
}

fn collect_rows(
    rows: impl Iterator<Item = rusqlite::Result<Row>>,
) -> Result<Vec<Message>, BackingError> {
    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?.into_message()?);
    }
    Ok(messages)
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

impl BackingStore for SqliteBackingStore {
    fn append(
        &self,
        stream_name: &str,
        message: &NewMessage,
        expected_version: Option<i64>,
    ) -> Result<i64, BackingError> {
        let data = serde_json::to_string(&message.data)?;
        let metadata = if message.metadata.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&message.metadata)?)
        };

        self.with_conn("append", |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let max_position: Option<i64> = tx.query_row(
                "SELECT MAX(position) FROM messages WHERE stream_name = ?1",
                params![stream_name],
                |row| row.get(0),
            )?;
            let stream_version = max_position.unwrap_or(NO_STREAM_VERSION);

            if let Some(expected) = expected_version {
                if expected != stream_version {
                    return Err(BackingError::WrongExpectedVersion { stream_version });
                }
            }

            let id = message.id.to_string();
            let duplicate = tx
                .query_row(
                    "SELECT 1 FROM messages WHERE id = ?1",
                    params![id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if duplicate {
                return Err(BackingError::DuplicateMessageId { id: message.id });
            }

            let position = stream_version + 1;
            tx.execute(
                "INSERT INTO messages (id, stream_name, category, type, position, data, metadata, time_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    stream_name,
                    stream_name::category(stream_name),
                    message.message_type,
                    position,
                    data,
                    metadata,
                    now_ms(),
                ],
            )?;
            tx.commit()?;

            Ok(position)
        })
    }

    fn stream_messages(
        &self,
        stream_name: &str,
        from_position: i64,
    ) -> Result<Vec<Message>, BackingError> {
        self.with_conn("stream read", |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {} FROM messages WHERE stream_name = ?1 AND position >= ?2 ORDER BY position",
                SELECT_COLUMNS
            ))?;
            let rows = stmt.query_map(params![stream_name, from_position], Row::read)?;
            collect_rows(rows)
        })
    }

    fn category_messages(
        &self,
        category: &str,
        after_global_position: i64,
        limit: usize,
    ) -> Result<Vec<Message>, BackingError> {
        self.with_conn("category read", |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {} FROM messages WHERE category = ?1 AND global_position > ?2
                 ORDER BY global_position LIMIT ?3",
                SELECT_COLUMNS
            ))?;
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let rows = stmt.query_map(params![category, after_global_position, limit], Row::read)?;
            collect_rows(rows)
        })
    }

    fn last_stream_message(&self, stream_name: &str) -> Result<Option<Message>, BackingError> {
        self.with_conn("last message read", |conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM messages WHERE stream_name = ?1 ORDER BY position DESC LIMIT 1",
                        SELECT_COLUMNS
                    ),
                    params![stream_name],
                    Row::read,
                )
                .optional()?;
            row.map(Row::into_message).transpose()
        })
    }
}
