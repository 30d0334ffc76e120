use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::CheckpointStore;
use crate::error::StoreError;
use crate::store::BackingError;

/// HashMap-backed checkpoints. Clones share storage.
#[derive(Clone, Default)]
pub struct InMemoryCheckpointStore {
    positions: Arc<RwLock<HashMap<String, i64>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn load(&self, aggregator: &str) -> Result<Option<i64>, StoreError> {
        let positions = self
            .positions
            .read()
            .map_err(|_| BackingError::LockPoisoned("checkpoint read"))?;
        Ok(positions.get(aggregator).copied())
    }

    fn save(&self, aggregator: &str, global_position: i64) -> Result<(), StoreError> {
        let mut positions = self
            .positions
            .write()
            .map_err(|_| BackingError::LockPoisoned("checkpoint write"))?;
        positions.insert(aggregator.to_string(), global_position);
        Ok(())
    }
}
