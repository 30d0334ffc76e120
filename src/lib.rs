//! # message_store
//!
//! An event-sourced message store: append-only streams with optimistic
//! concurrency, projections that fold a stream into entity state, and
//! catch-up aggregators that drive categories into read models.
//!
//! Stream names follow `category-id`; commands live in
//! `category:command-id`. Positions within a stream start at 0, and every
//! message also gets a store-wide `global_position` starting at 1.

pub mod aggregator;
pub mod app;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod identity;
pub mod loader;
pub mod logging;
pub mod message;
pub mod projection;
pub mod read_model;
pub mod reader;
pub mod store;
pub mod viewing;
pub mod writer;

pub use crate::aggregator::{
    Aggregator, AggregatorError, AggregatorStats, AggregatorThread, BatchOutcome, HandlerError,
    Phase,
};
pub use crate::app::{App, AppError, Running};
pub use crate::checkpoint::{CheckpointStore, InMemoryCheckpointStore, StreamCheckpointStore};
pub use crate::config::Settings;
pub use crate::error::StoreError;
pub use crate::loader::{EntityLoader, Loaded};
pub use crate::message::{stream_name, Message, NewMessage};
pub use crate::projection::{project, Projection};
pub use crate::read_model::{
    InMemoryReadModelStore, ReadModel, ReadModelError, ReadModelRepository, ReadModelStore,
    ReadModelsExt, Versioned,
};
pub use crate::reader::MessageReader;
pub use crate::store::{BackingError, BackingStore, InMemoryBackingStore, NO_STREAM_VERSION};
pub use crate::writer::{ExpectedVersion, MessageWriter};

#[cfg(feature = "sqlite")]
pub use crate::read_model::SqliteReadModelStore;
#[cfg(feature = "sqlite")]
pub use crate::store::SqliteBackingStore;
