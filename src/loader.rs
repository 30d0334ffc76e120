//! Reconstituting entity state from its stream.

use crate::error::StoreError;
use crate::projection::Projection;
use crate::reader::MessageReader;
use crate::store::{BackingStore, NO_STREAM_VERSION};
use crate::writer::ExpectedVersion;

/// Entity state together with the stream version it was folded from.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<S> {
    pub state: S,
    /// Position of the last message in the stream, −1 if empty.
    pub version: i64,
}

impl<S> Loaded<S> {
    /// The precondition for writing the next message to this entity's stream.
    pub fn expected_version(&self) -> ExpectedVersion {
        ExpectedVersion::from_version(self.version)
    }

    pub fn into_state(self) -> S {
        self.state
    }
}

#[derive(Clone)]
pub struct EntityLoader<B> {
    reader: MessageReader<B>,
}

impl<B: BackingStore> EntityLoader<B> {
    pub fn new(reader: MessageReader<B>) -> Self {
        Self { reader }
    }

    /// Fold the stream through `projection`.
    ///
    /// An empty stream yields the projection's initial state.
    pub fn load<S>(&self, stream_name: &str, projection: &Projection<S>) -> Result<S, StoreError> {
        Ok(self.load_versioned(stream_name, projection)?.state)
    }

    pub fn load_versioned<S>(
        &self,
        stream_name: &str,
        projection: &Projection<S>,
    ) -> Result<Loaded<S>, StoreError> {
        let messages = self.reader.read_stream(stream_name)?;
        let version = messages
            .last()
            .map(|message| message.position)
            .unwrap_or(NO_STREAM_VERSION);
        let state = projection.project(&messages);
        tracing::trace!(stream_name, version, "entity loaded");
        Ok(Loaded { state, version })
    }

    pub fn reader(&self) -> &MessageReader<B> {
        &self.reader
    }
}
