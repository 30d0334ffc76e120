//! Aggregator checkpoints: the last global position an aggregator applied.

mod in_memory;
mod stream;

use crate::error::StoreError;

pub use in_memory::InMemoryCheckpointStore;
pub use stream::{position_stream_name, StreamCheckpointStore, POSITION_CATEGORY};

/// One named integer per aggregator.
pub trait CheckpointStore: Send + Sync {
    /// The last saved global position, or `None` if nothing was saved yet.
    fn load(&self, aggregator: &str) -> Result<Option<i64>, StoreError>;

    /// Overwrite the saved position.
    fn save(&self, aggregator: &str, global_position: i64) -> Result<(), StoreError>;
}

impl<T: CheckpointStore + ?Sized> CheckpointStore for std::sync::Arc<T> {
    fn load(&self, aggregator: &str) -> Result<Option<i64>, StoreError> {
        (**self).load(aggregator)
    }

    fn save(&self, aggregator: &str, global_position: i64) -> Result<(), StoreError> {
        (**self).save(aggregator, global_position)
    }
}
