//! InMemoryReadModelStore - HashMap-backed read model store for tests and development.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use super::{ReadModel, ReadModelError, ReadModelStore, Versioned};

struct StoredModel {
    data: Value,
    version: u64,
}

type Collections = HashMap<(String, String), StoredModel>;

/// In-memory read model store keyed by `(collection, id)`.
///
/// Clone-friendly via Arc.
#[derive(Clone, Default)]
pub struct InMemoryReadModelStore {
    storage: Arc<RwLock<Collections>>,
}

impl InMemoryReadModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, ReadModelError> {
        self.storage
            .read()
            .map_err(|_| ReadModelError::Storage("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, ReadModelError> {
        self.storage
            .write()
            .map_err(|_| ReadModelError::Storage("lock poisoned".into()))
    }
}

fn key<M: ReadModel>(id: &str) -> (String, String) {
    (M::COLLECTION.to_string(), id.to_string())
}

fn decode<M: ReadModel>(stored: &StoredModel) -> Result<Versioned<M>, ReadModelError> {
    Ok(Versioned {
        data: serde_json::from_value(stored.data.clone())?,
        version: stored.version,
    })
}

impl ReadModelStore for InMemoryReadModelStore {
    fn get_model<M: ReadModel>(&self, id: &str) -> Result<Option<Versioned<M>>, ReadModelError> {
        let storage = self.read()?;
        storage.get(&key::<M>(id)).map(decode).transpose()
    }

    fn insert_model<M: ReadModel>(&self, model: &M) -> Result<Versioned<M>, ReadModelError> {
        if self.insert_model_if_absent(model)? {
            Ok(Versioned {
                data: model.clone(),
                version: 1,
            })
        } else {
            Err(ReadModelError::AlreadyExists {
                collection: M::COLLECTION.to_string(),
                id: model.id().to_string(),
            })
        }
    }

    fn insert_model_if_absent<M: ReadModel>(&self, model: &M) -> Result<bool, ReadModelError> {
        let data = serde_json::to_value(model)?;
        let mut storage = self.write()?;
        let key = key::<M>(model.id());
        if storage.contains_key(&key) {
            return Ok(false);
        }
        storage.insert(key, StoredModel { data, version: 1 });
        Ok(true)
    }

    fn update_model<M: ReadModel>(
        &self,
        model: &M,
        expected_version: u64,
    ) -> Result<Versioned<M>, ReadModelError> {
        let data = serde_json::to_value(model)?;
        let mut storage = self.write()?;

        let stored = storage
            .get_mut(&key::<M>(model.id()))
            .ok_or_else(|| ReadModelError::NotFound {
                collection: M::COLLECTION.to_string(),
                id: model.id().to_string(),
            })?;

        if stored.version != expected_version {
            return Err(ReadModelError::ConcurrencyConflict {
                collection: M::COLLECTION.to_string(),
                id: model.id().to_string(),
                expected: expected_version,
                actual: stored.version,
            });
        }

        stored.data = data;
        stored.version += 1;
        Ok(Versioned {
            data: model.clone(),
            version: stored.version,
        })
    }

    fn upsert_model<M: ReadModel>(&self, model: &M) -> Result<Versioned<M>, ReadModelError> {
        let data = serde_json::to_value(model)?;
        let mut storage = self.write()?;
        let stored = storage
            .entry(key::<M>(model.id()))
            .and_modify(|stored| stored.version += 1)
            .or_insert(StoredModel {
                data: Value::Null,
                version: 1,
            });
        stored.data = data;
        Ok(Versioned {
            data: model.clone(),
            version: stored.version,
        })
    }

    fn delete_model<M: ReadModel>(&self, id: &str) -> Result<bool, ReadModelError> {
        let mut storage = self.write()?;
        Ok(storage.remove(&key::<M>(id)).is_some())
    }

    fn find_one_model<M: ReadModel>(
        &self,
        predicate: &dyn Fn(&M) -> bool,
    ) -> Result<Option<Versioned<M>>, ReadModelError> {
        let storage = self.read()?;
        for ((collection, _), stored) in storage.iter() {
            if collection != M::COLLECTION {
                continue;
            }
            let model = decode::<M>(stored)?;
            if predicate(&model.data) {
                return Ok(Some(model));
            }
        }
        Ok(None)
    }
}
