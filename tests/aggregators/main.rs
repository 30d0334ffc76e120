//! Catch-up aggregators: resumption, idempotence, and the thread driver.

#[path = "../support/mod.rs"]
mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use message_store::identity::{
    identity_component, load_identity, user_credentials_aggregator, RegisterUsers, Registration,
    UserCredential,
};
use message_store::viewing::{home_page_aggregator, record_viewing, HomePage, HOME_PAGE};
use message_store::{
    Aggregator, AggregatorThread, BackingError, CheckpointStore, EntityLoader, ExpectedVersion,
    HandlerError, InMemoryBackingStore, InMemoryCheckpointStore, InMemoryReadModelStore,
    MessageReader, MessageWriter, ReadModelsExt, StoreError, StreamCheckpointStore,
};

use support::{catch_up, named, wait_until};

fn recorder(
    store: &InMemoryBackingStore,
    checkpoints: StreamCheckpointStore<InMemoryBackingStore>,
    seen: Arc<Mutex<Vec<i64>>>,
) -> Aggregator<InMemoryBackingStore, StreamCheckpointStore<InMemoryBackingStore>> {
    Aggregator::new("recorder", "counter", MessageReader::new(store.clone()), checkpoints)
        .with_batch_size(3)
        .on("Incremented", move |message| {
            seen.lock().unwrap().push(message.data_i64("n").unwrap());
            Ok(())
        })
}

#[test]
fn restart_resumes_after_the_last_checkpoint() {
    let store = InMemoryBackingStore::new();
    let writer = MessageWriter::new(store.clone());
    for n in 0..5 {
        writer
            .write(&format!("counter-{}", n % 2), &named("Incremented", n), ExpectedVersion::Any)
            .unwrap();
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut first = recorder(&store, StreamCheckpointStore::new(store.clone()), seen.clone());
    first.init().unwrap();
    first.process_batch().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    drop(first);

    for n in 5..7 {
        writer
            .write("counter-0", &named("Incremented", n), ExpectedVersion::Any)
            .unwrap();
    }

    let mut second = recorder(&store, StreamCheckpointStore::new(store.clone()), seen.clone());
    second.init().unwrap();
    assert_eq!(second.position(), 3);
    catch_up(&mut second);
    assert_eq!(*seen.lock().unwrap(), (0..7).collect::<Vec<_>>());
}

#[test]
fn checkpoint_store_survives_between_instances() {
    let store = InMemoryBackingStore::new();
    let checkpoints = StreamCheckpointStore::new(store.clone());
    checkpoints.save("recorder", 11).unwrap();
    let reopened = StreamCheckpointStore::new(store);
    assert_eq!(reopened.load("recorder").unwrap(), Some(11));
}

#[test]
fn home_page_counts_each_view_once_across_replays() {
    let store = InMemoryBackingStore::new();
    let writer = MessageWriter::new(store.clone());
    for video in ["v1", "v2", "v1"] {
        record_viewing(&writer, "trace", "u1", video).unwrap();
    }

    let read_models = InMemoryReadModelStore::new();
    let mut aggregator = home_page_aggregator(
        MessageReader::new(store.clone()),
        read_models.clone(),
        InMemoryCheckpointStore::new(),
    );
    aggregator.init().unwrap();
    assert_eq!(catch_up(&mut aggregator), 3);

    // A fresh checkpoint forces a full replay over the same read models.
    let mut replay = home_page_aggregator(
        MessageReader::new(store),
        read_models.clone(),
        InMemoryCheckpointStore::new(),
    );
    replay.init().unwrap();
    catch_up(&mut replay);

    let home = read_models
        .read_models::<HomePage>()
        .get(HOME_PAGE)
        .unwrap()
        .unwrap();
    assert_eq!(home.data.videos_watched, 3);
    assert_eq!(home.data.last_view_processed, 3);
}

#[test]
fn registration_flows_from_command_to_credentials() {
    let store = InMemoryBackingStore::new();
    let read_models = InMemoryReadModelStore::new();
    let users = RegisterUsers::new(MessageWriter::new(store.clone()), read_models.clone());
    users
        .register_user(
            "trace-1",
            &Registration {
                id: "u1".into(),
                email: "u1@example.com".into(),
                password_hash: "hash".into(),
            },
        )
        .unwrap();

    let mut component = identity_component(store.clone(), InMemoryCheckpointStore::new());
    let mut credentials = user_credentials_aggregator(
        MessageReader::new(store.clone()),
        read_models.clone(),
        InMemoryCheckpointStore::new(),
    );
    component.init().unwrap();
    credentials.init().unwrap();
    assert_eq!(catch_up(&mut component), 1);
    assert_eq!(catch_up(&mut credentials), 1);

    let loader = EntityLoader::new(MessageReader::new(store));
    let identity = load_identity(&loader, "u1").unwrap();
    assert!(identity.state.is_registered);
    assert_eq!(identity.version, 0);

    let credential = UserCredential::find_by_email(&read_models, "u1@example.com")
        .unwrap()
        .unwrap();
    assert_eq!(credential.data.id, "u1");
}

#[test]
fn thread_catches_up_and_reports_stats() {
    let store = InMemoryBackingStore::new();
    let writer = MessageWriter::new(store.clone());
    let read_models = InMemoryReadModelStore::new();
    let checkpoints = InMemoryCheckpointStore::new();

    let thread = AggregatorThread::spawn(
        home_page_aggregator(
            MessageReader::new(store.clone()),
            read_models.clone(),
            checkpoints.clone(),
        ),
        Duration::from_millis(10),
    );

    record_viewing(&writer, "t1", "u1", "v1").unwrap();
    record_viewing(&writer, "t2", "u2", "v2").unwrap();
    thread.wake();

    let pages = read_models.read_models::<HomePage>();
    assert!(wait_until(Duration::from_secs(5), || {
        pages
            .get(HOME_PAGE)
            .unwrap()
            .map_or(false, |home| home.data.videos_watched == 2)
    }));

    let stats = thread.stop();
    assert_eq!(stats.messages_applied, 2);
    assert_eq!(stats.position, 2);
    assert!(stats.fatal_error.is_none());
    assert_eq!(checkpoints.load("home-page").unwrap(), Some(2));
}

#[test]
fn thread_ends_on_a_fatal_read_error() {
    let thread = AggregatorThread::spawn(
        Aggregator::new(
            "misconfigured",
            "not-a-category",
            MessageReader::new(InMemoryBackingStore::new()),
            InMemoryCheckpointStore::new(),
        ),
        Duration::from_millis(10),
    );
    assert!(wait_until(Duration::from_secs(5), || thread.is_finished()));
    let stats = thread.stop();
    assert!(stats.fatal_error.is_some());
}

#[test]
fn thread_ends_when_a_handler_hits_a_storage_outage() {
    let store = InMemoryBackingStore::new();
    MessageWriter::new(store.clone())
        .write("counter-1", &named("Incremented", 1), ExpectedVersion::Any)
        .unwrap();
    let checkpoints = InMemoryCheckpointStore::new();

    let thread = AggregatorThread::spawn(
        Aggregator::new("outage", "counter", MessageReader::new(store), checkpoints.clone())
            .on("Incremented", |_| {
                Err(HandlerError::Store(StoreError::Backing(
                    BackingError::Unavailable("down".into()),
                )))
            }),
        Duration::from_millis(10),
    );
    assert!(wait_until(Duration::from_secs(5), || thread.is_finished()));

    let stats = thread.stop();
    assert_eq!(stats.handler_failures, 0);
    assert!(stats
        .fatal_error
        .as_deref()
        .map_or(false, |err| err.contains("down")));
    assert_eq!(checkpoints.load("outage").unwrap(), None);
}
