//! Reading streams and categories.
//!
//! Reads are plain queries with no cursor state; they can be repeated and
//! run concurrently with writes. A message written concurrently may or may
//! not be observed, but once observed it never changes.

use crate::error::StoreError;
use crate::message::{stream_name, Message};
use crate::store::BackingStore;

#[derive(Clone)]
pub struct MessageReader<B> {
    store: B,
}

impl<B: BackingStore> MessageReader<B> {
    pub fn new(store: B) -> Self {
        Self { store }
    }

    /// All messages of a stream, ascending by position.
    pub fn read_stream(&self, stream_name: &str) -> Result<Vec<Message>, StoreError> {
        self.read_stream_from(stream_name, 0)
    }

    /// Messages of a stream from `position` (inclusive) on.
    pub fn read_stream_from(
        &self,
        stream_name: &str,
        position: i64,
    ) -> Result<Vec<Message>, StoreError> {
        if stream_name.is_empty() {
            return Err(StoreError::Validation("stream name must not be empty".into()));
        }
        Ok(self.store.stream_messages(stream_name, position)?)
    }

    /// Up to `batch_size` messages of `category` with a global position
    /// strictly greater than `since_global_position`, ascending.
    pub fn read_category(
        &self,
        category: &str,
        since_global_position: i64,
        batch_size: usize,
    ) -> Result<Vec<Message>, StoreError> {
        if category.is_empty() || !stream_name::is_category(category) {
            return Err(StoreError::Validation(format!(
                "'{}' is not a category name",
                category
            )));
        }
        if batch_size == 0 {
            return Err(StoreError::Validation("batch size must be at least 1".into()));
        }
        Ok(self
            .store
            .category_messages(category, since_global_position, batch_size)?)
    }

    pub fn read_last_message(&self, stream_name: &str) -> Result<Option<Message>, StoreError> {
        Ok(self.store.last_stream_message(stream_name)?)
    }

    pub fn store(&self) -> &B {
        &self.store
    }
}
