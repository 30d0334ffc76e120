//! SqliteReadModelStore - read models as JSON rows in one SQLite table.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::{ReadModel, ReadModelError, ReadModelStore, Versioned};

const CREATE_READ_MODELS: &str = r#"
CREATE TABLE IF NOT EXISTS read_models (
    collection TEXT NOT NULL,
    id         TEXT NOT NULL,
    version    INTEGER NOT NULL,
    data       TEXT NOT NULL,
    PRIMARY KEY (collection, id)
)
"#;

/// Read model store backed by SQLite.
///
/// Clones share one connection behind a mutex.
#[derive(Clone)]
pub struct SqliteReadModelStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReadModelStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReadModelError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, ReadModelError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Open `path`, treating `":memory:"` as a private in-memory database.
    pub fn open_path(path: &str) -> Result<Self, ReadModelError> {
        if path == ":memory:" {
            Self::open_in_memory()
        } else {
            Self::open(path)
        }
    }

    pub fn from_connection(conn: Connection) -> Result<Self, ReadModelError> {
        conn.execute_batch(CREATE_READ_MODELS)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ReadModelError> {
        self.conn
            .lock()
            .map_err(|_| ReadModelError::Storage("connection lock poisoned".into()))
    }
}

fn stored_version<M: ReadModel>(conn: &Connection, id: &str) -> Result<Option<u64>, ReadModelError> {
    let version: Option<i64> = conn
        .query_row(
            "SELECT version FROM read_models WHERE collection = ?1 AND id = ?2",
            params![M::COLLECTION, id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version.map(|v| v as u64))
}

impl ReadModelStore for SqliteReadModelStore {
    fn get_model<M: ReadModel>(&self, id: &str) -> Result<Option<Versioned<M>>, ReadModelError> {
        let conn = self.conn()?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT data, version FROM read_models WHERE collection = ?1 AND id = ?2",
                params![M::COLLECTION, id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(data, version)| {
            Ok(Versioned {
                data: serde_json::from_str(&data)?,
                version: version as u64,
            })
        })
        .transpose()
    }

    fn insert_model<M: ReadModel>(&self, model: &M) -> Result<Versioned<M>, ReadModelError> {
        if self.insert_model_if_absent(model)? {
            Ok(Versioned {
                data: model.clone(),
                version: 1,
            })
        } else {
            Err(ReadModelError::AlreadyExists {
                collection: M::COLLECTION.to_string(),
                id: model.id().to_string(),
            })
        }
    }

    fn insert_model_if_absent<M: ReadModel>(&self, model: &M) -> Result<bool, ReadModelError> {
        let data = serde_json::to_string(model)?;
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO read_models (collection, id, version, data) VALUES (?1, ?2, 1, ?3)",
            params![M::COLLECTION, model.id(), data],
        )?;
        Ok(inserted == 1)
    }

    fn update_model<M: ReadModel>(
        &self,
        model: &M,
        expected_version: u64,
    ) -> Result<Versioned<M>, ReadModelError> {
        let data = serde_json::to_string(model)?;
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE read_models SET data = ?1, version = version + 1
             WHERE collection = ?2 AND id = ?3 AND version = ?4",
            params![data, M::COLLECTION, model.id(), expected_version as i64],
        )?;

        if updated == 1 {
            return Ok(Versioned {
                data: model.clone(),
                version: expected_version + 1,
            });
        }

        match stored_version::<M>(&conn, model.id())? {
            Some(actual) => Err(ReadModelError::ConcurrencyConflict {
                collection: M::COLLECTION.to_string(),
                id: model.id().to_string(),
                expected: expected_version,
                actual,
            }),
            None => Err(ReadModelError::NotFound {
                collection: M::COLLECTION.to_string(),
                id: model.id().to_string(),
            }),
        }
    }

    fn upsert_model<M: ReadModel>(&self, model: &M) -> Result<Versioned<M>, ReadModelError> {
        let data = serde_json::to_string(model)?;
        let conn = self.conn()?;
        let version: i64 = conn.query_row(
            "INSERT INTO read_models (collection, id, version, data) VALUES (?1, ?2, 1, ?3)
             ON CONFLICT (collection, id) DO UPDATE SET data = excluded.data, version = version + 1
             RETURNING version",
            params![M::COLLECTION, model.id(), data],
            |row| row.get(0),
        )?;
        Ok(Versioned {
            data: model.clone(),
            version: version as u64,
        })
    }

    fn delete_model<M: ReadModel>(&self, id: &str) -> Result<bool, ReadModelError> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM read_models WHERE collection = ?1 AND id = ?2",
            params![M::COLLECTION, id],
        )?;
        Ok(deleted > 0)
    }

    fn find_one_model<M: ReadModel>(
        &self,
        predicate: &dyn Fn(&M) -> bool,
    ) -> Result<Option<Versioned<M>>, ReadModelError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare_cached("SELECT data, version FROM read_models WHERE collection = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![M::COLLECTION], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (data, version) = row?;
            let model: M = serde_json::from_str(&data)?;
            if predicate(&model) {
                return Ok(Some(Versioned {
                    data: model,
                    version: version as u64,
                }));
            }
        }
        Ok(None)
    }
}
