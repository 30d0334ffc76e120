//! Writer, reader, loader and projection behavior against the in-memory store.

#[path = "../support/mod.rs"]
mod support;

use message_store::identity::{identity_projection, load_identity, IdentityState};
use message_store::{
    project, BackingError, EntityLoader, ExpectedVersion, InMemoryBackingStore, Message,
    MessageReader, MessageWriter, NewMessage, Projection, StoreError,
};
use uuid::Uuid;

use support::{named, race_to_create, registered};

fn store() -> (MessageWriter<InMemoryBackingStore>, MessageReader<InMemoryBackingStore>) {
    let store = InMemoryBackingStore::new();
    (MessageWriter::new(store.clone()), MessageReader::new(store))
}

#[test]
fn chasing_the_expected_version_writes_dense_positions() {
    let (writer, reader) = store();
    let mut version = -1;
    for n in 0..10 {
        version = writer
            .write("counter-1", &named("Incremented", n), ExpectedVersion::from_version(version))
            .unwrap();
        assert_eq!(version, n);
    }

    let messages = reader.read_stream("counter-1").unwrap();
    let positions: Vec<i64> = messages.iter().map(|m| m.position).collect();
    assert_eq!(positions, (0..10).collect::<Vec<_>>());
    let ns: Vec<i64> = messages.iter().filter_map(|m| m.data_i64("n")).collect();
    assert_eq!(ns, (0..10).collect::<Vec<_>>());
}

#[test]
fn stale_expected_version_is_rejected_without_writing() {
    let (writer, reader) = store();
    writer.write("counter-1", &named("Incremented", 0), ExpectedVersion::NoStream).unwrap();
    writer.write("counter-1", &named("Incremented", 1), ExpectedVersion::Exact(0)).unwrap();

    let err = writer
        .write("counter-1", &named("Incremented", 2), ExpectedVersion::Exact(0))
        .unwrap_err();
    match err {
        StoreError::VersionConflict {
            stream_name,
            expected_version,
            actual_version,
        } => {
            assert_eq!(stream_name, "counter-1");
            assert_eq!(expected_version, 0);
            assert_eq!(actual_version, 1);
        }
        other => panic!("expected a version conflict, got {other:?}"),
    }
    assert_eq!(reader.read_stream("counter-1").unwrap().len(), 2);
}

#[test]
fn message_ids_are_unique_across_streams() {
    let (writer, reader) = store();
    let id = Uuid::new_v4();
    writer
        .write("counter-1", &named("Incremented", 0).with_id(id), ExpectedVersion::Any)
        .unwrap();

    let err = writer
        .write("counter-2", &named("Incremented", 0).with_id(id), ExpectedVersion::Any)
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Backing(BackingError::DuplicateMessageId { id: duplicate }) if duplicate == id
    ));
    assert!(reader.read_stream("counter-2").unwrap().is_empty());
    assert_eq!(reader.read_stream("counter-1").unwrap()[0].id, id);
}

#[test]
fn registration_end_to_end() {
    let store = InMemoryBackingStore::new();
    let writer = MessageWriter::new(store.clone());
    let event = registered("U", "u@example.com");

    assert_eq!(
        writer.write("identity-U", &event, ExpectedVersion::NoStream).unwrap(),
        0
    );

    let err = writer
        .write("identity-U", &event, ExpectedVersion::NoStream)
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::VersionConflict {
            actual_version: 0,
            ..
        }
    ));

    let loader = EntityLoader::new(MessageReader::new(store));
    let identity = load_identity(&loader, "U").unwrap().state;
    assert_eq!(
        identity,
        IdentityState {
            id: Some("U".into()),
            email: Some("u@example.com".into()),
            is_registered: true,
            registration_email_sent: false,
        }
    );
}

#[test]
fn category_reads_follow_global_order_across_streams() {
    let (writer, reader) = store();
    let plan = [
        ("viewing-a", "VideoViewed"),
        ("identity-1", "Registered"),
        ("viewing-b", "VideoViewed"),
        ("viewing-a", "VideoViewed"),
        ("identity:command-1", "Register"),
        ("viewing-c", "VideoViewed"),
    ];
    for (stream, message_type) in plan {
        writer
            .write(stream, &NewMessage::new(message_type), ExpectedVersion::Any)
            .unwrap();
    }

    let viewing = reader.read_category("viewing", 0, 100).unwrap();
    let order: Vec<(&str, i64)> = viewing
        .iter()
        .map(|m| (m.stream_name.as_str(), m.global_position))
        .collect();
    assert_eq!(
        order,
        vec![("viewing-a", 1), ("viewing-b", 3), ("viewing-a", 4), ("viewing-c", 6)]
    );

    let identity = reader.read_category("identity", 0, 100).unwrap();
    assert_eq!(identity.len(), 1);
    let commands = reader.read_category("identity:command", 0, 100).unwrap();
    assert_eq!(commands.len(), 1);

    let paged = reader.read_category("viewing", 3, 2).unwrap();
    let globals: Vec<i64> = paged.iter().map(|m| m.global_position).collect();
    assert_eq!(globals, vec![4, 6]);
}

#[derive(Debug, Default, PartialEq)]
struct Title {
    current: Option<String>,
}

fn renamed(mut state: Title, message: &Message) -> Title {
    state.current = message.data_str("title").map(str::to_string);
    state
}

#[test]
fn projection_result_depends_on_message_order() {
    let (writer, reader) = store();
    for title in ["first", "second"] {
        writer
            .write(
                "video-1",
                &NewMessage::new("Renamed").with_data("title", title),
                ExpectedVersion::Any,
            )
            .unwrap();
    }
    let mut messages = reader.read_stream("video-1").unwrap();
    let projection = Projection::new(Title::default).on("Renamed", renamed);

    let forward = project(&messages, &projection);
    assert_eq!(forward, project(&messages, &projection));
    assert_eq!(forward.current.as_deref(), Some("second"));

    messages.reverse();
    assert_eq!(
        project(&messages, &projection).current.as_deref(),
        Some("first")
    );
}

#[test]
fn loading_ignores_unknown_types() {
    let (writer, reader) = store();
    writer
        .write("identity-2", &NewMessage::new("ProfileViewed"), ExpectedVersion::Any)
        .unwrap();
    let loader = EntityLoader::new(reader);
    let loaded = loader
        .load_versioned("identity-2", &identity_projection())
        .unwrap();
    assert!(!loaded.state.is_registered);
    assert_eq!(loaded.version, 0);
}

#[test]
fn concurrent_creators_get_exactly_one_stream() {
    let store = InMemoryBackingStore::new();
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
