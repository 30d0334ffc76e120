//! Running an aggregator on its own thread.

use std::sync::mpsc::{channel, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::Aggregator;
use crate::checkpoint::CheckpointStore;
use crate::store::BackingStore;

/// Statistics from an aggregator thread.
#[derive(Debug, Default, Clone)]
pub struct AggregatorStats {
    pub batches: usize,
    pub messages_applied: usize,
    pub messages_skipped: usize,
    pub handler_failures: usize,
    pub polls: usize,
    /// Checkpoint when the loop ended.
    pub position: i64,
    /// Set when the loop ended on a read, checkpoint or init failure.
    pub fatal_error: Option<String>,
}

enum Control {
    Wake,
    Stop,
}

/// A background thread that keeps an aggregator caught up.
///
/// The loop repeats batches while they return messages, then waits up to
/// `poll_interval` for new ones (or a `wake`). Stopping is honored between
/// batches, so an in-flight batch always finishes with its checkpoint.
///
/// ## Example
///
/// ```ignore
/// let thread = AggregatorThread::spawn(aggregator, Duration::from_millis(100));
/// // ... write messages ...
/// thread.wake();
/// let stats = thread.stop();
/// println!("applied {} messages", stats.messages_applied);
/// ```
pub struct AggregatorThread {
    name: String,
    control_tx: Sender<Control>,
    handle: Option<JoinHandle<AggregatorStats>>,
}

impl AggregatorThread {
    /// Spawn the thread. `init` runs on the new thread before the first batch.
    pub fn spawn<B, C>(mut aggregator: Aggregator<B, C>, poll_interval: Duration) -> Self
    where
        B: BackingStore + 'static,
        C: CheckpointStore + 'static,
    {
        let (control_tx, control_rx) = channel();
        let name = aggregator.name().to_string();
        let span = tracing::info_span!("aggregator", aggregator = %name);

        let handle = thread::spawn(move || {
            let _entered = span.enter();
            let mut stats = AggregatorStats::default();

            if let Err(err) = aggregator.init() {
                tracing::error!(error = %err, "aggregator failed to start");
                stats.fatal_error = Some(err.to_string());
                return stats;
            }

            loop {
                match control_rx.try_recv() {
                    Ok(Control::Stop) | Err(TryRecvError::Disconnected) => break,
                    Ok(Control::Wake) | Err(TryRecvError::Empty) => {}
                }

                stats.polls += 1;
                match aggregator.process_batch() {
                    Ok(outcome) => {
                        stats.batches += 1;
                        stats.messages_applied += outcome.applied;
                        stats.messages_skipped += outcome.skipped;
                        if outcome.fetched > 0 {
                            continue;
                        }
                    }
                    Err(err) if err.is_fatal() => {
                        tracing::error!(error = %err, "aggregator stopped");
                        stats.fatal_error = Some(err.to_string());
                        break;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "batch failed, retrying next cycle");
                        stats.handler_failures += 1;
                    }
                }

                match control_rx.recv_timeout(poll_interval) {
                    Ok(Control::Wake) | Err(RecvTimeoutError::Timeout) => {}
                    Ok(Control::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            stats.position = aggregator.position();
            tracing::info!(
                batches = stats.batches,
                applied = stats.messages_applied,
                position = stats.position,
                "aggregator stopped"
            );
            stats
        });

        Self {
            name,
            control_tx,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cut the current wait short and check for messages now.
    pub fn wake(&self) {
        let _ = self.control_tx.send(Control::Wake);
    }

    /// Signal the thread to stop and wait for it to finish.
    /// Returns the thread statistics.
    pub fn stop(mut self) -> AggregatorStats {
        let _ = self.control_tx.send(Control::Stop);
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => AggregatorStats::default(),
        }
    }

    /// Signal the thread to stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.control_tx.send(Control::Stop);
    }

    /// True once the loop has exited, e.g. after a fatal error.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for AggregatorThread {
    fn drop(&mut self) {
        let _ = self.control_tx.send(Control::Stop);
    }
}
