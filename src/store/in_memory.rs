//! InMemoryBackingStore - Vec-backed message log for tests and development.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use uuid::Uuid;

use super::{BackingError, BackingStore, NO_STREAM_VERSION};
use crate::message::{stream_name, Message, NewMessage};

#[derive(Default)]
struct Log {
    /// All messages in global order; `messages[i].global_position == i + 1`.
    messages: Vec<Message>,
    /// Stream name → indexes into `messages`, in position order.
    streams: HashMap<String, Vec<usize>>,
    ids: HashSet<Uuid>,
}

impl Log {
    fn stream_version(&self, stream_name: &str) -> i64 {
        self.streams
            .get(stream_name)
            .map(|indexes| indexes.len() as i64 - 1)
            .unwrap_or(NO_STREAM_VERSION)
    }
}

/// In-memory message log.
///
/// Clone-friendly via Arc: clones share the same log. Appends take the write
/// lock, so the version check, the id check and the global position
/// assignment happen atomically.
#[derive(Clone, Default)]
pub struct InMemoryBackingStore {
    log: Arc<RwLock<Log>>,
}

impl InMemoryBackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages across all streams.
    pub fn len(&self) -> Result<usize, BackingError> {
        let log = self
            .log
            .read()
            .map_err(|_| BackingError::LockPoisoned("len"))?;
        Ok(log.messages.len())
    }

    pub fn is_empty(&self) -> Result<bool, BackingError> {
        Ok(self.len()? == 0)
    }
}

impl BackingStore for InMemoryBackingStore {
    fn append(
        &self,
        stream_name: &str,
        message: &NewMessage,
        expected_version: Option<i64>,
    ) -> Result<i64, BackingError> {
        let mut log = self
            .log
            .write()
            .map_err(|_| BackingError::LockPoisoned("append"))?;

        let stream_version = log.stream_version(stream_name);
        if let Some(expected) = expected_version {
            if expected != stream_version {
                return Err(BackingError::WrongExpectedVersion { stream_version });
            }
        }

        if log.ids.contains(&message.id) {
            return Err(BackingError::DuplicateMessageId { id: message.id });
        }

        let position = stream_version + 1;
        let index = log.messages.len();
        log.messages.push(Message {
            id: message.id,
            stream_name: stream_name.to_string(),
            message_type: message.message_type.clone(),
            position,
            global_position: index as i64 + 1,
            data: message.data.clone(),
            metadata: message.metadata.clone(),
            time: SystemTime::now(),
        });
        log.ids.insert(message.id);
        log.streams
            .entry(stream_name.to_string())
            .or_default()
            .push(index);

        Ok(position)
    }

    fn stream_messages(
        &self,
        stream_name: &str,
        from_position: i64,
    ) -> Result<Vec<Message>, BackingError> {
        let log = self
            .log
            .read()
            .map_err(|_| BackingError::LockPoisoned("stream read"))?;

        let Some(indexes) = log.streams.get(stream_name) else {
            return Ok(Vec::new());
        };

        let skip = from_position.max(0) as usize;
        Ok(indexes
            .iter()
            .skip(skip)
            .map(|&index| log.messages[index].clone())
            .collect())
    }

    fn category_messages(
        &self,
        category: &str,
        after_global_position: i64,
        limit: usize,
    ) -> Result<Vec<Message>, BackingError> {
        let log = self
            .log
            .read()
            .map_err(|_| BackingError::LockPoisoned("category read"))?;

        // global_position n lives at index n - 1
        let start = after_global_position.max(0) as usize;
        Ok(log
            .messages
            .iter()
            .skip(start)
            .filter(|message| stream_name::belongs_to(&message.stream_name, category))
            .take(limit)
            .cloned()
            .collect())
    }

    fn last_stream_message(&self, stream_name: &str) -> Result<Option<Message>, BackingError> {
        let log = self
            .log
            .read()
            .map_err(|_| BackingError::LockPoisoned("last message read"))?;

        Ok(log
            .streams
            .get(stream_name)
            .and_then(|indexes| indexes.last())
            .map(|&index| log.messages[index].clone()))
    }
}
