//! The same guarantees on the SQLite adapters, including restarts against
//! an on-disk database.

#![cfg(feature = "sqlite")]

#[path = "../support/mod.rs"]
mod support;

use message_store::config::AggregatorConfig;
use message_store::identity::{load_identity, Registration};
use message_store::viewing::{home_page_aggregator, HomePage, HOME_PAGE};
use message_store::{
    App, CheckpointStore, EntityLoader, ExpectedVersion, MessageReader, MessageWriter,
    ReadModelsExt, SqliteBackingStore, SqliteReadModelStore, StoreError, StreamCheckpointStore,
};

use support::{catch_up, named, race_to_create, registered};

#[test]
fn optimistic_append_on_sqlite() {
    let store = SqliteBackingStore::open_in_memory().unwrap();
    let writer = MessageWriter::new(store.clone());
    let event = registered("U", "u@example.com");

    assert_eq!(writer.write("identity-U", &event, ExpectedVersion::NoStream).unwrap(), 0);
    assert!(matches!(
        writer.write("identity-U", &event, ExpectedVersion::NoStream),
        Err(StoreError::VersionConflict {
            actual_version: 0,
            ..
        })
    ));

    let loader = EntityLoader::new(MessageReader::new(store));
    let identity = load_identity(&loader, "U").unwrap();
    assert!(identity.state.is_registered);
    assert_eq!(identity.state.email.as_deref(), Some("u@example.com"));
    assert_eq!(identity.version, 0);
}

#[test]
fn positions_are_dense_per_stream_and_global_across_streams() {
    let store = SqliteBackingStore::open_in_memory().unwrap();
    let writer = MessageWriter::new(store.clone());
    for n in 0..6 {
        writer
            .write(&format!("counter-{}", n % 3), &named("Incremented", n), ExpectedVersion::Any)
            .unwrap();
    }

    let reader = MessageReader::new(store);
    let stream: Vec<i64> = reader
        .read_stream("counter-1")
        .unwrap()
        .iter()
        .map(|m| m.position)
        .collect();
    assert_eq!(stream, vec![0, 1]);

    let globals: Vec<i64> = reader
        .read_category("counter", 0, 10)
        .unwrap()
        .iter()
        .map(|m| m.global_position)
        .collect();
    assert_eq!(globals, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn aggregator_resumes_after_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("messages.db");
    let models_path = dir.path().join("read_models.db");

    {
        let store = SqliteBackingStore::open(&log_path).unwrap();
        let read_models = SqliteReadModelStore::open(&models_path).unwrap();
        let writer = MessageWriter::new(store.clone());
        for video in ["v1", "v2"] {
            message_store::viewing::record_viewing(&writer, "t", "u1", video).unwrap();
        }

        let mut aggregator = home_page_aggregator(
            MessageReader::new(store.clone()),
            read_models,
            StreamCheckpointStore::new(store),
        );
        aggregator.init().unwrap();
        assert_eq!(catch_up(&mut aggregator), 2);
    }

    let store = SqliteBackingStore::open(&log_path).unwrap();
    let read_models = SqliteReadModelStore::open(&models_path).unwrap();
    let checkpoints = StreamCheckpointStore::new(store.clone());
    let checkpoint = checkpoints.load("home-page").unwrap().unwrap();

    let writer = MessageWriter::new(store.clone());
    message_store::viewing::record_viewing(&writer, "t", "u2", "v3").unwrap();

    let mut aggregator = home_page_aggregator(
        MessageReader::new(store),
        read_models.clone(),
        checkpoints,
    );
    aggregator.init().unwrap();
    assert_eq!(aggregator.position(), checkpoint);
    assert_eq!(catch_up(&mut aggregator), 1);

    let home = read_models
        .read_models::<HomePage>()
        .get(HOME_PAGE)
        .unwrap()
        .unwrap();
    assert_eq!(home.data.videos_watched, 3);
}

#[test]
fn app_wiring_over_sqlite() {
    let app = App::new(
        SqliteBackingStore::open_in_memory().unwrap(),
        SqliteReadModelStore::open_in_memory().unwrap(),
        AggregatorConfig::default(),
    );
    app.register_users
        .register_user(
            "trace-1",
            &Registration {
                id: "u1".into(),
                email: "u1@example.com".into(),
                password_hash: "hash".into(),
            },
        )
        .unwrap();
    app.record_viewing("trace-2", "u1", "v1").unwrap();

    for mut aggregator in app.aggregators() {
        aggregator.init().unwrap();
        catch_up(&mut aggregator);
    }

    assert!(load_identity(&app.loader, "u1").unwrap().state.is_registered);
    let home = app
        .read_models()
        .read_models::<HomePage>()
        .get(HOME_PAGE)
        .unwrap()
        .unwrap();
    assert_eq!(home.data.videos_watched, 1);
}

#[test]
fn concurrent_creators_share_one_sqlite_stream() {
    let store = SqliteBackingStore::open_in_memory().unwrap();
    let results = race_to_create(&store, "race-1", 8);

    assert_eq!(results.iter().filter(|r| matches!(r, Ok(0))).count(), 1);
    let conflicts = results
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(StoreError::VersionConflict {
                    actual_version: 0,
                    ..
                })
            )
        })
        .count();
    assert_eq!(conflicts, 7);

    let positions: Vec<i64> = MessageReader::new(store)
        .read_stream("race-1")
        .unwrap()
        .iter()
        .map(|m| m.position)
        .collect();
    assert_eq!(positions, vec![0]);
}
