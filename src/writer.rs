//! Appending messages with optimistic concurrency control.

use crate::error::StoreError;
use crate::message::NewMessage;
use crate::store::{BackingError, BackingStore, NO_STREAM_VERSION};

/// Precondition on the stream version for a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Write regardless of the current version.
    Any,
    /// The stream must be empty; the message lands at position 0.
    NoStream,
    /// The stream must currently be at this version.
    Exact(u64),
}

impl ExpectedVersion {
    /// Expect the given stream version, where −1 (or any negative value)
    /// means the stream does not exist yet.
    pub fn from_version(version: i64) -> Self {
        if version < 0 {
            ExpectedVersion::NoStream
        } else {
            ExpectedVersion::Exact(version as u64)
        }
    }

    /// The version the store must observe, if any.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ExpectedVersion::Any => None,
            ExpectedVersion::NoStream => Some(NO_STREAM_VERSION),
            ExpectedVersion::Exact(version) => Some(*version as i64),
        }
    }
}

/// Appends messages to streams.
#[derive(Clone)]
pub struct MessageWriter<B> {
    store: B,
}

impl<B: BackingStore> MessageWriter<B> {
    pub fn new(store: B) -> Self {
        Self { store }
    }

    /// Append `message` to `stream_name`, returning its stream position.
    ///
    /// A version mismatch becomes [`StoreError::VersionConflict`] carrying the
    /// version the store reported; other store failures pass through.
    pub fn write(
        &self,
        stream_name: &str,
        message: &NewMessage,
        expected_version: ExpectedVersion,
    ) -> Result<i64, StoreError> {
        validate(stream_name, message)?;

        match self
            .store
            .append(stream_name, message, expected_version.as_i64())
        {
            Ok(position) => {
                tracing::debug!(
                    stream_name,
                    message_type = %message.message_type,
                    message_id = %message.id,
                    position,
                    "message written"
                );
                Ok(position)
            }
            Err(BackingError::WrongExpectedVersion { stream_version }) => {
                let expected = expected_version.as_i64().unwrap_or(NO_STREAM_VERSION);
                tracing::warn!(
                    stream_name,
                    message_type = %message.message_type,
                    expected_version = expected,
                    actual_version = stream_version,
                    "version conflict"
                );
                Err(StoreError::VersionConflict {
                    stream_name: stream_name.to_string(),
                    expected_version: expected,
                    actual_version: stream_version,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Write the first message of a stream.
    pub fn write_initial(&self, stream_name: &str, message: &NewMessage) -> Result<i64, StoreError> {
        self.write(stream_name, message, ExpectedVersion::NoStream)
    }

    pub fn store(&self) -> &B {
        &self.store
    }
}

fn validate(stream_name: &str, message: &NewMessage) -> Result<(), StoreError> {
    if message.message_type.trim().is_empty() {
        return Err(StoreError::Validation("messages must have a type".into()));
    }
    if stream_name.trim().is_empty() {
        return Err(StoreError::Validation("stream name must not be empty".into()));
    }
    Ok(())
}
