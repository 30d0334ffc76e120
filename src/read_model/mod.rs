//! Read Models - denormalized documents materialized by aggregators.
//!
//! Each document lives in a collection under an id and carries a
//! store-managed version (1 on insert, +1 per write). Aggregator handlers use
//! the version for per-row conditional writes, so several aggregators may
//! share a collection safely.
//!
//! ## Example
//!
//! ```
//! use message_store::{InMemoryReadModelStore, ReadModel, ReadModelsExt};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct Page {
//!     name: String,
//!     hits: u64,
//! }
//!
//! impl ReadModel for Page {
//!     const COLLECTION: &'static str = "pages";
//!     fn id(&self) -> &str {
//!         &self.name
//!     }
//! }
//!
//! let store = InMemoryReadModelStore::new();
//! let pages = store.read_models::<Page>();
//! pages.insert_if_absent(&Page { name: "home".into(), hits: 0 })?;
//! pages.modify("home", |page| {
//!     let mut page = page.clone();
//!     page.hits += 1;
//!     Some(page)
//! })?;
//! assert_eq!(pages.get("home")?.unwrap().data.hits, 1);
//! # Ok::<(), message_store::ReadModelError>(())
//! ```

mod in_memory;
mod repository;
#[cfg(feature = "sqlite")]
mod sqlite;
mod store;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Trait for types that can be stored as read models.
pub trait ReadModel: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Collection name, e.g. a table in SQL.
    const COLLECTION: &'static str;

    /// Natural key of this document within its collection.
    fn id(&self) -> &str;
}

/// A document together with its store-managed version.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub data: T,
    pub version: u64,
}

#[derive(Debug, Error)]
pub enum ReadModelError {
    #[error("concurrency conflict on {collection}:{id} (expected version {expected}, actual {actual})")]
    ConcurrencyConflict {
        collection: String,
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("read model already exists: {collection}:{id}")]
    AlreadyExists { collection: String, id: String },

    #[error("read model not found: {collection}:{id}")]
    NotFound { collection: String, id: String },

    #[error("read model serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("read model storage error: {0}")]
    Storage(String),

    #[cfg(feature = "sqlite")]
    #[error("read model sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub use in_memory::InMemoryReadModelStore;
pub use repository::{ReadModelRepository, ReadModelsExt};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteReadModelStore;
pub use store::ReadModelStore;
