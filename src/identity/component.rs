//! Identity component - handles `Register` commands.

use super::events::{Register, Registered, REGISTER, REGISTERED};
use super::projection::{identity_stream_name, load_identity};
use super::IDENTITY_CATEGORY;
use crate::aggregator::Aggregator;
use crate::checkpoint::CheckpointStore;
use crate::loader::EntityLoader;
use crate::message::{stream_name, NewMessage};
use crate::reader::MessageReader;
use crate::store::BackingStore;
use crate::writer::MessageWriter;

pub const IDENTITY_COMPONENT: &str = "identity-component";

/// Aggregator over `identity:command`.
///
/// A `Register` for an identity that is already registered is dropped, so
/// redelivered commands write nothing. Otherwise `Registered` is written at
/// the loaded version; a concurrent registration loses with a version
/// conflict and is re-evaluated on the next cycle.
pub fn identity_component<B, C>(store: B, checkpoints: C) -> Aggregator<B, C>
where
    B: BackingStore + Clone + 'static,
    C: CheckpointStore,
{
    let writer = MessageWriter::new(store.clone());
    let loader = EntityLoader::new(MessageReader::new(store.clone()));

    Aggregator::new(
        IDENTITY_COMPONENT,
        stream_name::command_category(IDENTITY_CATEGORY),
        MessageReader::new(store),
        checkpoints,
    )
    .on(REGISTER, move |command| {
        let register: Register = command.decode()?;
        let identity = load_identity(&loader, &register.user_id)?;

        if identity.state.is_registered {
            tracing::debug!(
                user_id = %register.user_id,
                global_position = command.global_position,
                "identity already registered, skipping command"
            );
            return Ok(());
        }

        let user_id = register.user_id.clone();
        let registered = NewMessage::encode(REGISTERED, &Registered::from(register))?.follow(command);
        writer.write(
            &identity_stream_name(&user_id),
            &registered,
            identity.expected_version(),
        )?;
        tracing::info!(user_id = %user_id, "identity registered");
        Ok(())
    })
}
