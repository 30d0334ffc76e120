//! Backing store adapters.
//!
//! A [`BackingStore`] is the only component that touches storage. It offers
//! one atomic conditional append and three read queries; everything else in
//! the crate is built on top of them.
//!
//! ```text
//! MessageWriter ──append──────────────┐
//! MessageReader ──stream_messages─────┤
//!               ──category_messages───┼──▶ BackingStore ──▶ InMemory | Sqlite
//!               ──last_stream_message─┘
//! ```

mod in_memory;
#[cfg(feature = "sqlite")]
mod sqlite;

use thiserror::Error;
use uuid::Uuid;

use crate::message::{Message, NewMessage};

pub use in_memory::InMemoryBackingStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackingStore;

/// Version of a stream that has no messages.
pub const NO_STREAM_VERSION: i64 = -1;

/// Failures reported by a backing store.
#[derive(Debug, Error)]
pub enum BackingError {
    /// The conditional append was refused: the stream is at `stream_version`.
    #[error("wrong expected version (stream version: {stream_version})")]
    WrongExpectedVersion { stream_version: i64 },

    #[error("message id {id} has already been written")]
    DuplicateMessageId { id: Uuid },

    #[error("store lock poisoned during {0}")]
    LockPoisoned(&'static str),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Atomic operations against a single store.
///
/// Implementations must assign `global_position` at commit time so that a
/// category reader never observes a later global position before an earlier
/// one has committed.
pub trait BackingStore: Send + Sync {
    /// Append `message` to `stream_name`.
    ///
    /// With `expected_version = Some(v)` the append succeeds only if the
    /// stream is currently at version `v` (−1 for an empty stream); the
    /// version check happens before the duplicate-id check. Returns the
    /// position of the new message.
    fn append(
        &self,
        stream_name: &str,
        message: &NewMessage,
        expected_version: Option<i64>,
    ) -> Result<i64, BackingError>;

    /// Messages of one stream with `position >= from_position`, ascending.
    fn stream_messages(
        &self,
        stream_name: &str,
        from_position: i64,
    ) -> Result<Vec<Message>, BackingError>;

    /// Messages whose stream belongs to `category` with
    /// `global_position > after_global_position`, ascending, at most `limit`.
    fn category_messages(
        &self,
        category: &str,
        after_global_position: i64,
        limit: usize,
    ) -> Result<Vec<Message>, BackingError>;

    /// The highest-positioned message of a stream.
    fn last_stream_message(&self, stream_name: &str) -> Result<Option<Message>, BackingError>;
}

impl<T: BackingStore + ?Sized> BackingStore for std::sync::Arc<T> {
    fn append(
        &self,
        stream_name: &str,
        message: &NewMessage,
        expected_version: Option<i64>,
    ) -> Result<i64, BackingError> {
        (**self).append(stream_name, message, expected_version)
    }

    fn stream_messages(
        &self,
        stream_name: &str,
        from_position: i64,
    ) -> Result<Vec<Message>, BackingError> {
        (**self).stream_messages(stream_name, from_position)
    }

    fn category_messages(
        &self,
        category: &str,
        after_global_position: i64,
        limit: usize,
    ) -> Result<Vec<Message>, BackingError> {
        (**self).category_messages(category, after_global_position, limit)
    }

    fn last_stream_message(&self, stream_name: &str) -> Result<Option<Message>, BackingError> {
        (**self).last_stream_message(stream_name)
    }
}
