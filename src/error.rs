use thiserror::Error;

use crate::store::BackingError;

/// Errors returned by the writer, reader, loader and checkpoint stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The caller supplied malformed input; nothing was sent to the store.
    #[error("validation error: {0}")]
    Validation(String),

    /// Optimistic concurrency failure. Reload the entity and retry, or
    /// surface the conflict to the caller.
    #[error(
        "version conflict on stream {stream_name} (expected version {expected_version}, actual {actual_version})"
    )]
    VersionConflict {
        stream_name: String,
        expected_version: i64,
        actual_version: i64,
    },

    /// Any other store failure. Not retried by this crate.
    #[error(transparent)]
    Backing(#[from] BackingError),
}

impl StoreError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}
