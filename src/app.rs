//! Process wiring: one store, one read-model store, and the aggregators
//! fed from them.

use thiserror::Error;
use uuid::Uuid;

use crate::aggregator::{Aggregator, AggregatorStats, AggregatorThread};
use crate::checkpoint::StreamCheckpointStore;
use crate::config::AggregatorConfig;
use crate::error::StoreError;
use crate::identity::{identity_component, user_credentials_aggregator, RegisterUsers};
use crate::loader::EntityLoader;
use crate::read_model::{ReadModelError, ReadModelStore};
use crate::reader::MessageReader;
use crate::store::{BackingError, BackingStore};
use crate::viewing::{home_page_aggregator, record_viewing};
use crate::writer::MessageWriter;

#[cfg(feature = "sqlite")]
use crate::config::Settings;
#[cfg(feature = "sqlite")]
use crate::read_model::SqliteReadModelStore;
#[cfg(feature = "sqlite")]
use crate::store::SqliteBackingStore;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("message store error: {0}")]
    Store(#[from] BackingError),

    #[error("read model store error: {0}")]
    ReadModel(#[from] ReadModelError),

    #[error(transparent)]
    Logging(#[from] crate::logging::LoggingError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The message store plus everything built on it.
///
/// Generic over the adapters so tests can run the full wiring in memory.
pub struct App<B, R> {
    store: B,
    read_models: R,
    aggregator_config: AggregatorConfig,
    pub writer: MessageWriter<B>,
    pub reader: MessageReader<B>,
    pub loader: EntityLoader<B>,
    pub register_users: RegisterUsers<B, R>,
}

impl<B, R> App<B, R>
where
    B: BackingStore + Clone + 'static,
    R: ReadModelStore + Clone + 'static,
{
    pub fn new(store: B, read_models: R, aggregator_config: AggregatorConfig) -> Self {
        let writer = MessageWriter::new(store.clone());
        let reader = MessageReader::new(store.clone());
        Self {
            loader: EntityLoader::new(reader.clone()),
            register_users: RegisterUsers::new(writer.clone(), read_models.clone()),
            store,
            read_models,
            aggregator_config,
            writer,
            reader,
        }
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    pub fn read_models(&self) -> &R {
        &self.read_models
    }

    pub fn record_viewing(
        &self,
        trace_id: &str,
        user_id: &str,
        video_id: &str,
    ) -> Result<Uuid, StoreError> {
        record_viewing(&self.writer, trace_id, user_id, video_id)
    }

    /// Every aggregator and component this process runs, checkpointed in
    /// the message store.
    pub fn aggregators(&self) -> Vec<Aggregator<B, StreamCheckpointStore<B>>> {
        let checkpoints = || StreamCheckpointStore::new(self.store.clone());
        let batch_size = self.aggregator_config.batch_size;
        vec![
            identity_component(self.store.clone(), checkpoints()),
            user_credentials_aggregator(self.reader.clone(), self.read_models.clone(), checkpoints()),
            home_page_aggregator(self.reader.clone(), self.read_models.clone(), checkpoints()),
        ]
        .into_iter()
        .map(|aggregator| aggregator.with_batch_size(batch_size))
        .collect()
    }

    /// Spawn one thread per aggregator.
    pub fn start(&self) -> Running {
        let poll_interval = self.aggregator_config.poll_interval();
        let threads = self
            .aggregators()
            .into_iter()
            .map(|aggregator| AggregatorThread::spawn(aggregator, poll_interval))
            .collect();
        Running { threads }
    }
}

#[cfg(feature = "sqlite")]
impl App<SqliteBackingStore, SqliteReadModelStore> {
    /// Open the SQLite databases named in `settings`.
    pub fn open(settings: &Settings) -> Result<Self, AppError> {
        let store = SqliteBackingStore::open_path(&settings.store.path)?;
        let read_models = SqliteReadModelStore::open_path(&settings.read_models.path)?;
        tracing::info!(
            store = %settings.store.path,
            read_models = %settings.read_models.path,
            "databases opened"
        );
        Ok(Self::new(store, read_models, settings.aggregator.clone()))
    }
}

/// Handles to the running aggregator threads.
pub struct Running {
    threads: Vec<AggregatorThread>,
}

impl Running {
    pub fn names(&self) -> Vec<&str> {
        self.threads.iter().map(AggregatorThread::name).collect()
    }

    /// Ask every aggregator to poll immediately.
    pub fn wake(&self) {
        for thread in &self.threads {
            thread.wake();
        }
    }

    /// Stop every aggregator, returning each one's statistics by name.
    pub fn stop(self) -> Vec<(String, AggregatorStats)> {
        for thread in &self.threads {
            thread.signal_stop();
        }
        self.threads
            .into_iter()
            .map(|thread| {
                let name = thread.name().to_string();
                (name, thread.stop())
            })
            .collect()
    }
}
