#[allow(clippy::module_inception)]
mod message;
pub mod stream_name;

pub use message::{keys, Fields, Message, NewMessage};
