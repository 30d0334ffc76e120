//! Shared helpers for the integration suites.

#![allow(dead_code)]

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use message_store::identity::{Registered, REGISTERED};
use message_store::{
    Aggregator, BackingStore, CheckpointStore, ExpectedVersion, MessageWriter, NewMessage,
    StoreError,
};

pub fn registered(user_id: &str, email: &str) -> NewMessage {
    NewMessage::encode(
        REGISTERED,
        &Registered {
            user_id: user_id.to_string(),
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
        },
    )
    .unwrap()
}

pub fn named(message_type: &str, n: i64) -> NewMessage {
    NewMessage::new(message_type).with_data("n", n)
}

/// Release `writers` threads at once, each creating `stream_name` with a
/// message of its own. Returns every thread's result.
pub fn race_to_create<B>(store: &B, stream_name: &str, writers: usize) -> Vec<Result<i64, StoreError>>
where
    B: BackingStore + Clone + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(writers));
    let handles: Vec<_> = (0..writers)
        .map(|n| {
            let writer = MessageWriter::new(store.clone());
            let barrier = barrier.clone();
            let stream_name = stream_name.to_string();
            thread::spawn(move || {
                let message = named("Created", n as i64);
                barrier.wait();
                writer.write(&stream_name, &message, ExpectedVersion::NoStream)
            })
        })
        .collect();
    handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect()
}

/// Run batches until one comes back empty. Returns the total applied.
pub fn catch_up<B: BackingStore, C: CheckpointStore>(aggregator: &mut Aggregator<B, C>) -> usize {
    let mut applied = 0;
    loop {
        let outcome = aggregator.process_batch().unwrap();
        if outcome.fetched == 0 {
            return applied;
        }
        applied += outcome.applied;
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
