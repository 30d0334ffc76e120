//! Checkpoints stored as messages in the message store itself.
//!
//! Each save appends a `Read { position }` message to
//! `aggregatorPosition-<name>`; loading reads the last message of that
//! stream. The position stream survives restarts along with the log.

use super::CheckpointStore;
use crate::error::StoreError;
use crate::message::{stream_name, NewMessage};
use crate::reader::MessageReader;
use crate::store::BackingStore;
use crate::writer::{ExpectedVersion, MessageWriter};

pub const POSITION_CATEGORY: &str = "aggregatorPosition";
const READ_TYPE: &str = "Read";

pub fn position_stream_name(aggregator: &str) -> String {
    stream_name::stream_name(POSITION_CATEGORY, aggregator)
}

#[derive(Clone)]
pub struct StreamCheckpointStore<B> {
    writer: MessageWriter<B>,
    reader: MessageReader<B>,
}

impl<B: BackingStore + Clone> StreamCheckpointStore<B> {
    pub fn new(store: B) -> Self {
        Self {
            writer: MessageWriter::new(store.clone()),
            reader: MessageReader::new(store),
        }
    }
}

impl<B: BackingStore> CheckpointStore for StreamCheckpointStore<B> {
    fn load(&self, aggregator: &str) -> Result<Option<i64>, StoreError> {
        let stream = position_stream_name(aggregator);
        let Some(last) = self.reader.read_last_message(&stream)? else {
            return Ok(None);
        };
        last.data_i64("position").map(Some).ok_or_else(|| {
            StoreError::Validation(format!(
                "position message {} in {} has no integer position",
                last.id, stream
            ))
        })
    }

    fn save(&self, aggregator: &str, global_position: i64) -> Result<(), StoreError> {
        let message = NewMessage::new(READ_TYPE).with_data("position", global_position);
        self.writer.write(
            &position_stream_name(aggregator),
            &message,
            ExpectedVersion::Any,
        )?;
        Ok(())
    }
}
