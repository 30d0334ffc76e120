use std::collections::HashMap;
use std::fmt;

use super::{AggregatorError, HandlerError};
use crate::checkpoint::CheckpointStore;
use crate::message::Message;
use crate::reader::MessageReader;
use crate::store::BackingStore;

pub const DEFAULT_BATCH_SIZE: usize = 100;

type Handler = Box<dyn Fn(&Message) -> Result<(), HandlerError> + Send + Sync>;
type InitHook = Box<dyn Fn() -> Result<(), HandlerError> + Send + Sync>;

/// Where the aggregator is within a catch-up cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    /// Running the handler for the message at this global position.
    Applying(i64),
    Checkpointing,
}

/// Result of one `process_batch` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub fetched: usize,
    pub applied: usize,
    pub skipped: usize,
    /// Checkpoint after the batch.
    pub position: i64,
}

/// Drives a category of messages into read models.
///
/// Each message is handled, then the checkpoint is saved at its global
/// position. A crash between the two reprocesses that message on restart,
/// so handlers must be idempotent.
///
/// ## Example
///
/// ```
/// use message_store::{
///     Aggregator, InMemoryBackingStore, InMemoryCheckpointStore, MessageReader,
///     MessageWriter, NewMessage, ExpectedVersion,
/// };
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let store = InMemoryBackingStore::new();
/// let writer = MessageWriter::new(store.clone());
/// writer.write("viewing-v1", &NewMessage::new("VideoViewed"), ExpectedVersion::Any)?;
///
/// let views = Arc::new(AtomicUsize::new(0));
/// let counter = views.clone();
/// let mut aggregator = Aggregator::new(
///     "view-counter",
///     "viewing",
///     MessageReader::new(store),
///     InMemoryCheckpointStore::new(),
/// )
/// .on("VideoViewed", move |_| {
///     counter.fetch_add(1, Ordering::SeqCst);
///     Ok(())
/// });
///
/// aggregator.init()?;
/// let outcome = aggregator.process_batch()?;
/// assert_eq!(outcome.applied, 1);
/// assert_eq!(views.load(Ordering::SeqCst), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Aggregator<B, C> {
    name: String,
    category: String,
    reader: MessageReader<B>,
    checkpoints: C,
    handlers: HashMap<String, Handler>,
    init_hook: Option<InitHook>,
    batch_size: usize,
    position: i64,
    phase: Phase,
}

impl<B: BackingStore, C: CheckpointStore> Aggregator<B, C> {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        reader: MessageReader<B>,
        checkpoints: C,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            reader,
            checkpoints,
            handlers: HashMap::new(),
            init_hook: None,
            batch_size: DEFAULT_BATCH_SIZE,
            position: 0,
            phase: Phase::Idle,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Register the handler for `message_type`, replacing any earlier one.
    pub fn on<F>(mut self, message_type: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handlers.insert(message_type.into(), Box::new(handler));
        self
    }

    /// Run `hook` from `init`, typically to seed read-model rows.
    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.init_hook = Some(Box::new(hook));
        self
    }

    /// Dispatch one message. Returns `false` if no handler is registered
    /// for its type.
    pub fn handle(&self, message: &Message) -> Result<bool, HandlerError> {
        match self.handlers.get(&message.message_type) {
            Some(handler) => {
                handler(message)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Load the checkpoint and run the init hook.
    pub fn init(&mut self) -> Result<(), AggregatorError> {
        self.position = self.load_checkpoint()?;
        if let Some(hook) = &self.init_hook {
            hook().map_err(AggregatorError::Init)?;
        }
        tracing::info!(
            aggregator = %self.name,
            category = %self.category,
            position = self.position,
            "aggregator initialized"
        );
        Ok(())
    }

    /// One catch-up cycle: read the next batch after the checkpoint and
    /// apply it in global order.
    ///
    /// A handler failure ends the batch with the checkpoint still at the
    /// last message that succeeded.
    pub fn process_batch(&mut self) -> Result<BatchOutcome, AggregatorError> {
        let result = self.run_batch();
        self.phase = Phase::Idle;
        result
    }

    fn run_batch(&mut self) -> Result<BatchOutcome, AggregatorError> {
        self.phase = Phase::Fetching;
        self.position = self.load_checkpoint()?;

        let messages = self
            .reader
            .read_category(&self.category, self.position, self.batch_size)
            .map_err(AggregatorError::Read)?;

        let mut outcome = BatchOutcome {
            fetched: messages.len(),
            position: self.position,
            ..BatchOutcome::default()
        };

        for message in &messages {
            self.phase = Phase::Applying(message.global_position);
            let handled = self.handle(message).map_err(|source| {
                tracing::warn!(
                    aggregator = %self.name,
                    message_type = %message.message_type,
                    global_position = message.global_position,
                    error = %source,
                    "handler failed"
                );
                AggregatorError::Handler {
                    message_type: message.message_type.clone(),
                    global_position: message.global_position,
                    source,
                }
            })?;

            if handled {
                outcome.applied += 1;
            } else {
                tracing::trace!(
                    aggregator = %self.name,
                    message_type = %message.message_type,
                    "no handler, skipping"
                );
                outcome.skipped += 1;
            }

            self.phase = Phase::Checkpointing;
            self.checkpoints
                .save(&self.name, message.global_position)
                .map_err(AggregatorError::Checkpoint)?;
            self.position = message.global_position;
            outcome.position = self.position;
        }

        if outcome.fetched > 0 {
            tracing::debug!(
                aggregator = %self.name,
                fetched = outcome.fetched,
                applied = outcome.applied,
                skipped = outcome.skipped,
                position = outcome.position,
                "batch processed"
            );
        }
        Ok(outcome)
    }

    fn load_checkpoint(&self) -> Result<i64, AggregatorError> {
        Ok(self
            .checkpoints
            .load(&self.name)
            .map_err(AggregatorError::Checkpoint)?
            .unwrap_or(0))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Last checkpoint seen by this aggregator.
    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
}

impl<B, C> fmt::Debug for Aggregator<B, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("Aggregator")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("handlers", &types)
            .field("batch_size", &self.batch_size)
            .field("position", &self.position)
            .field("phase", &self.phase)
            .finish()
    }
}
