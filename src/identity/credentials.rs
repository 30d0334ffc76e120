//! user_credentials - one row per registered user, keyed by user id.

use serde::{Deserialize, Serialize};

use super::events::{Registered, REGISTERED};
use super::IDENTITY_CATEGORY;
use crate::aggregator::Aggregator;
use crate::checkpoint::CheckpointStore;
use crate::reader::MessageReader;
use crate::read_model::{ReadModel, ReadModelError, ReadModelStore, ReadModelsExt, Versioned};
use crate::store::BackingStore;

pub const USER_CREDENTIALS_AGGREGATOR: &str = "user-credentials";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCredential {
    pub id: String,
    pub email: String,
    pub password_hash: String,
}

impl ReadModel for UserCredential {
    const COLLECTION: &'static str = "user_credentials";

    fn id(&self) -> &str {
        &self.id
    }
}

impl UserCredential {
    pub fn find_by_email<S: ReadModelStore>(
        store: &S,
        email: &str,
    ) -> Result<Option<Versioned<UserCredential>>, ReadModelError> {
        store
            .read_models::<UserCredential>()
            .find_one(&|credential| credential.email == email)
    }
}

impl From<Registered> for UserCredential {
    fn from(registered: Registered) -> Self {
        UserCredential {
            id: registered.user_id,
            email: registered.email,
            password_hash: registered.password_hash,
        }
    }
}

/// Aggregator over `identity` recording each `Registered` user.
///
/// Rows are inserted only if absent, so replays leave the first write.
pub fn user_credentials_aggregator<B, R, C>(
    reader: MessageReader<B>,
    read_models: R,
    checkpoints: C,
) -> Aggregator<B, C>
where
    B: BackingStore,
    R: ReadModelStore + 'static,
    C: CheckpointStore,
{
    Aggregator::new(
        USER_CREDENTIALS_AGGREGATOR,
        IDENTITY_CATEGORY,
        reader,
        checkpoints,
    )
    .on(REGISTERED, move |message| {
        let registered: Registered = message.decode()?;
        let credential = UserCredential::from(registered);
        let inserted = read_models
            .read_models::<UserCredential>()
            .insert_if_absent(&credential)?;
        if !inserted {
            tracing::debug!(user_id = %credential.id, "credentials already recorded");
        }
        Ok(())
    })
}
