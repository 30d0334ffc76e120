//! ReadModelRepository - typed accessor for one read-model collection.

use std::marker::PhantomData;

use super::{ReadModel, ReadModelError, ReadModelStore, Versioned};

/// Attempts `modify` makes before giving up on a contended row.
const MAX_MODIFY_ATTEMPTS: usize = 16;

/// Typed view of a `ReadModelStore` for documents of type `M`.
pub struct ReadModelRepository<'a, S, M> {
    store: &'a S,
    _marker: PhantomData<M>,
}

impl<'a, S: ReadModelStore, M: ReadModel> ReadModelRepository<'a, S, M> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<Versioned<M>>, ReadModelError> {
        self.store.get_model(id)
    }

    pub fn insert(&self, model: &M) -> Result<Versioned<M>, ReadModelError> {
        self.store.insert_model(model)
    }

    pub fn insert_if_absent(&self, model: &M) -> Result<bool, ReadModelError> {
        self.store.insert_model_if_absent(model)
    }

    pub fn update(&self, model: &M, expected_version: u64) -> Result<Versioned<M>, ReadModelError> {
        self.store.update_model(model, expected_version)
    }

    pub fn upsert(&self, model: &M) -> Result<Versioned<M>, ReadModelError> {
        self.store.upsert_model(model)
    }

    pub fn delete(&self, id: &str) -> Result<bool, ReadModelError> {
        self.store.delete_model::<M>(id)
    }

    pub fn find_one(
        &self,
        predicate: &dyn Fn(&M) -> bool,
    ) -> Result<Option<Versioned<M>>, ReadModelError> {
        self.store.find_one_model(predicate)
    }

    /// Read-modify-write with compare-and-swap.
    ///
    /// `change` receives the current document and returns the replacement,
    /// or `None` to leave it untouched. On a concurrent write the document is
    /// re-read and `change` runs again. Returns the written document, or
    /// `None` if `change` declined.
    pub fn modify<F>(&self, id: &str, mut change: F) -> Result<Option<Versioned<M>>, ReadModelError>
    where
        F: FnMut(&M) -> Option<M>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let current = self.get(id)?.ok_or_else(|| ReadModelError::NotFound {
                collection: M::COLLECTION.to_string(),
                id: id.to_string(),
            })?;

            let Some(next) = change(&current.data) else {
                return Ok(None);
            };

            match self.update(&next, current.version) {
                Ok(written) => return Ok(Some(written)),
                Err(ReadModelError::ConcurrencyConflict { .. }) if attempt < MAX_MODIFY_ATTEMPTS => {
                    tracing::debug!(
                        collection = M::COLLECTION,
                        id,
                        attempt,
                        "read model changed concurrently, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Extension trait for typed read model access on any ReadModelStore.
pub trait ReadModelsExt: ReadModelStore + Sized {
    fn read_models<M: ReadModel>(&self) -> ReadModelRepository<'_, Self, M> {
        ReadModelRepository::new(self)
    }
}

impl<S: ReadModelStore> ReadModelsExt for S {}
