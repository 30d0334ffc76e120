use serde::Serialize;

use super::events::{REGISTERED, REGISTRATION_EMAIL_SENT};
use super::IDENTITY_CATEGORY;
use crate::error::StoreError;
use crate::loader::{EntityLoader, Loaded};
use crate::message::{stream_name, Message};
use crate::projection::Projection;
use crate::store::BackingStore;

/// Identity entity state folded from `identity-<id>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityState {
    pub id: Option<String>,
    pub email: Option<String>,
    pub is_registered: bool,
    pub registration_email_sent: bool,
}

fn registered(mut identity: IdentityState, message: &Message) -> IdentityState {
    identity.id = message.data_str("userId").map(str::to_string);
    identity.email = message.data_str("email").map(str::to_string);
    identity.is_registered = true;
    identity
}

fn registration_email_sent(mut identity: IdentityState, _: &Message) -> IdentityState {
    identity.registration_email_sent = true;
    identity
}

pub fn identity_projection() -> Projection<IdentityState> {
    Projection::new(IdentityState::default)
        .on(REGISTERED, registered)
        .on(REGISTRATION_EMAIL_SENT, registration_email_sent)
}

pub fn identity_stream_name(identity_id: &str) -> String {
    stream_name::stream_name(IDENTITY_CATEGORY, identity_id)
}

/// Load `identity-<identity_id>` with its stream version.
pub fn load_identity<B: BackingStore>(
    loader: &EntityLoader<B>,
    identity_id: &str,
) -> Result<Loaded<IdentityState>, StoreError> {
    loader.load_versioned(&identity_stream_name(identity_id), &identity_projection())
}
