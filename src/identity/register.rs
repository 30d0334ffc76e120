use thiserror::Error;
use uuid::Uuid;

use super::credentials::UserCredential;
use super::events::{Register, REGISTER};
use super::IDENTITY_CATEGORY;
use crate::error::StoreError;
use crate::message::{stream_name, NewMessage};
use crate::read_model::{ReadModelError, ReadModelStore};
use crate::store::BackingStore;
use crate::writer::{ExpectedVersion, MessageWriter};

/// User-supplied registration attributes. The password arrives hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub id: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("invalid registration: {0}")]
    Validation(String),

    #[error("email already registered: {email}")]
    AlreadyRegistered { email: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    ReadModel(#[from] ReadModelError),
}

/// Issues `Register` commands after a superficial check.
#[derive(Clone)]
pub struct RegisterUsers<B, R> {
    writer: MessageWriter<B>,
    read_models: R,
}

impl<B: BackingStore, R: ReadModelStore> RegisterUsers<B, R> {
    pub fn new(writer: MessageWriter<B>, read_models: R) -> Self {
        Self { writer, read_models }
    }

    /// Validate, reject known emails, then write the command to
    /// `identity:command-<id>`. Returns the command's message id.
    pub fn register_user(
        &self,
        trace_id: &str,
        attributes: &Registration,
    ) -> Result<Uuid, RegistrationError> {
        validate(attributes)?;

        if UserCredential::find_by_email(&self.read_models, &attributes.email)?.is_some() {
            return Err(RegistrationError::AlreadyRegistered {
                email: attributes.email.clone(),
            });
        }

        let command = NewMessage::encode(
            REGISTER,
            &Register {
                user_id: attributes.id.clone(),
                email: attributes.email.clone(),
                password_hash: attributes.password_hash.clone(),
            },
        )
        .map_err(|e| RegistrationError::Validation(e.to_string()))?
        .with_trace_id(trace_id)
        .with_user_id(attributes.id.as_str());

        let stream = stream_name::command_stream_name(IDENTITY_CATEGORY, &attributes.id);
        self.writer.write(&stream, &command, ExpectedVersion::Any)?;
        tracing::info!(trace_id, user_id = %attributes.id, "register command written");
        Ok(command.id)
    }
}

fn validate(attributes: &Registration) -> Result<(), RegistrationError> {
    if attributes.id.trim().is_empty() {
        return Err(RegistrationError::Validation("user id must not be empty".into()));
    }
    if !attributes.email.contains('@') {
        return Err(RegistrationError::Validation(format!(
            "'{}' is not an email address",
            attributes.email
        )));
    }
    if attributes.password_hash.is_empty() {
        return Err(RegistrationError::Validation("password hash must not be empty".into()));
    }
    Ok(())
}
