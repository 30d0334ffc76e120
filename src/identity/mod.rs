//! Identity - user registration as commands, events and read models.
//!
//! `RegisterUsers` writes `Register` commands to `identity:command-<id>`.
//! The identity component turns each command into a `Registered` event on
//! `identity-<id>`, and the user-credentials aggregator records every
//! registered user so later registrations can be checked by email.

mod component;
mod credentials;
mod events;
mod projection;
mod register;

pub use component::{identity_component, IDENTITY_COMPONENT};
pub use credentials::{user_credentials_aggregator, UserCredential, USER_CREDENTIALS_AGGREGATOR};
pub use events::{Register, Registered, REGISTER, REGISTERED, REGISTRATION_EMAIL_SENT};
pub use projection::{identity_projection, identity_stream_name, load_identity, IdentityState};
pub use register::{RegisterUsers, Registration, RegistrationError};

pub const IDENTITY_CATEGORY: &str = "identity";
