use thiserror::Error;

use crate::error::StoreError;
use crate::read_model::ReadModelError;

/// Failure inside a single message handler or init hook.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    ReadModel(#[from] ReadModelError),

    /// The message's data did not have the shape the handler needs.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl HandlerError {
    /// Conflicts and bad messages can succeed on a later attempt. Storage
    /// outages cannot be waited out inside the loop.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HandlerError::Store(StoreError::VersionConflict { .. })
                | HandlerError::ReadModel(ReadModelError::ConcurrencyConflict { .. })
                | HandlerError::InvalidMessage(_)
        )
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::InvalidMessage(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("checkpoint failed: {0}")]
    Checkpoint(#[source] StoreError),

    #[error("category read failed: {0}")]
    Read(#[source] StoreError),

    #[error("init hook failed: {0}")]
    Init(#[source] HandlerError),

    /// The batch stopped at this message; the checkpoint still points at
    /// the one before it.
    #[error("handler for {message_type} at global position {global_position} failed: {source}")]
    Handler {
        message_type: String,
        global_position: i64,
        #[source]
        source: HandlerError,
    },
}

impl AggregatorError {
    /// Fatal errors stop the aggregator loop. Retryable handler failures
    /// are retried on the next cycle.
    pub fn is_fatal(&self) -> bool {
        match self {
            AggregatorError::Handler { source, .. } => !source.is_retryable(),
            _ => true,
        }
    }
}
