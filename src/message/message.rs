use std::time::SystemTime;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::stream_name;

/// Message payload and metadata: a JSON object.
pub type Fields = Map<String, Value>;

/// Well-known metadata keys.
pub mod keys {
    pub const TRACE_ID: &str = "traceId";
    pub const USER_ID: &str = "userId";
    pub const CAUSATION_STREAM_NAME: &str = "causationMessageStreamName";
    pub const CAUSATION_POSITION: &str = "causationMessagePosition";
    pub const CAUSATION_GLOBAL_POSITION: &str = "causationMessageGlobalPosition";
    pub const CORRELATION_STREAM_NAME: &str = "correlationStreamName";
}

/// A message that has not been written yet.
///
/// The producer assigns the id; the store rejects a second write of the same id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub data: Fields,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Fields,
}

impl NewMessage {
    pub fn new(message_type: impl Into<String>) -> Self {
        NewMessage {
            id: Uuid::new_v4(),
            message_type: message_type.into(),
            data: Fields::new(),
            metadata: Fields::new(),
        }
    }

    /// Create a message whose data is the serialized form of `data`.
    ///
    /// `data` must serialize to a JSON object.
    pub fn encode<T: Serialize>(
        message_type: impl Into<String>,
        data: &T,
    ) -> Result<Self, serde_json::Error> {
        let mut message = NewMessage::new(message_type);
        message.data = to_fields(data)?;
        Ok(message)
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_trace_id(self, trace_id: impl Into<String>) -> Self {
        self.with_meta(keys::TRACE_ID, trace_id.into())
    }

    pub fn with_user_id(self, user_id: impl Into<String>) -> Self {
        self.with_meta(keys::USER_ID, user_id.into())
    }

    /// Mark this message as caused by `cause`.
    ///
    /// Copies trace, user and correlation metadata and records the causing
    /// message's stream name and positions.
    pub fn follow(mut self, cause: &Message) -> Self {
        for key in [keys::TRACE_ID, keys::USER_ID, keys::CORRELATION_STREAM_NAME] {
            if let Some(value) = cause.metadata.get(key) {
                self.metadata.insert(key.to_string(), value.clone());
            }
        }
        self.with_meta(keys::CAUSATION_STREAM_NAME, cause.stream_name.clone())
            .with_meta(keys::CAUSATION_POSITION, cause.position)
            .with_meta(keys::CAUSATION_GLOBAL_POSITION, cause.global_position)
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// A message as recorded by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub stream_name: String,
    #[serde(rename = "type")]
    pub message_type: String,
    /// Zero-based position within the stream.
    pub position: i64,
    /// Store-wide sequence number.
    pub global_position: i64,
    #[serde(default)]
    pub data: Fields,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Fields,
    pub time: SystemTime,
}

impl Message {
    /// Deserialize the data into the specified type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.data.clone()))
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn data_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(Value::as_i64)
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.meta_str(keys::TRACE_ID)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.meta_str(keys::USER_ID)
    }

    pub fn causation_stream_name(&self) -> Option<&str> {
        self.meta_str(keys::CAUSATION_STREAM_NAME)
    }

    pub fn category(&self) -> &str {
        stream_name::category(&self.stream_name)
    }

    /// The id part of the stream name.
    pub fn stream_id(&self) -> Option<&str> {
        stream_name::id(&self.stream_name)
    }
}

pub(crate) fn to_fields<T: Serialize>(value: &T) -> Result<Fields, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        Value::Null => Ok(Fields::new()),
        _ => Err(<serde_json::Error as serde::ser::Error>::custom(
            "message data must serialize to a JSON object",
        )),
    }
}
