use serde::{Deserialize, Serialize};

pub const REGISTER: &str = "Register";
pub const REGISTERED: &str = "Registered";
pub const REGISTRATION_EMAIL_SENT: &str = "RegistrationEmailSent";

/// Command data: register a new user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Register {
    pub user_id: String,
    pub email: String,
    pub password_hash: String,
}

/// Event data: the user is registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registered {
    pub user_id: String,
    pub email: String,
    pub password_hash: String,
}

impl From<Register> for Registered {
    fn from(command: Register) -> Self {
        Registered {
            user_id: command.user_id,
            email: command.email,
            password_hash: command.password_hash,
        }
    }
}
