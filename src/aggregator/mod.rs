//! Aggregators - catch-up subscribers that fold a category into read models.

#[allow(clippy::module_inception)]
mod aggregator;
mod error;
mod thread;

pub use aggregator::{Aggregator, BatchOutcome, Phase, DEFAULT_BATCH_SIZE};
pub use error::{AggregatorError, HandlerError};
pub use thread::{AggregatorStats, AggregatorThread};
