//! ReadModelStore - storage seam for read models.

use super::{ReadModel, ReadModelError, Versioned};

/// Versioned document storage.
///
/// `ReadModelRepository` (via `ReadModelsExt::read_models`) wraps these
/// methods with a typed accessor and a compare-and-swap retry helper.
pub trait ReadModelStore: Send + Sync {
    /// Get a read model by id. Returns None if not found.
    fn get_model<M: ReadModel>(&self, id: &str) -> Result<Option<Versioned<M>>, ReadModelError>;

    /// Insert a new read model at version 1. Fails with `AlreadyExists`.
    fn insert_model<M: ReadModel>(&self, model: &M) -> Result<Versioned<M>, ReadModelError>;

    /// Insert at version 1 unless the id is taken. Returns whether it inserted.
    fn insert_model_if_absent<M: ReadModel>(&self, model: &M) -> Result<bool, ReadModelError>;

    /// Overwrite an existing read model iff it is at `expected_version`.
    fn update_model<M: ReadModel>(
        &self,
        model: &M,
        expected_version: u64,
    ) -> Result<Versioned<M>, ReadModelError>;

    /// Insert or overwrite without a version check.
    fn upsert_model<M: ReadModel>(&self, model: &M) -> Result<Versioned<M>, ReadModelError>;

    /// Delete a read model by id. Returns true if it existed.
    fn delete_model<M: ReadModel>(&self, id: &str) -> Result<bool, ReadModelError>;

    /// First read model of the collection matching `predicate`.
    fn find_one_model<M: ReadModel>(
        &self,
        predicate: &dyn Fn(&M) -> bool,
    ) -> Result<Option<Versioned<M>>, ReadModelError>;
}
