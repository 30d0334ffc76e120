use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::VIEWING_CATEGORY;
use crate::error::StoreError;
use crate::message::{stream_name, NewMessage};
use crate::store::BackingStore;
use crate::writer::{ExpectedVersion, MessageWriter};

pub const VIDEO_VIEWED: &str = "VideoViewed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoViewed {
    pub user_id: String,
    pub video_id: String,
}

pub fn viewing_stream_name(video_id: &str) -> String {
    stream_name::stream_name(VIEWING_CATEGORY, video_id)
}

/// Record that `user_id` watched `video_id`. Returns the event's message id.
pub fn record_viewing<B: BackingStore>(
    writer: &MessageWriter<B>,
    trace_id: &str,
    user_id: &str,
    video_id: &str,
) -> Result<Uuid, StoreError> {
    if video_id.is_empty() {
        return Err(StoreError::Validation("video id must not be empty".into()));
    }

    let event = NewMessage::encode(
        VIDEO_VIEWED,
        &VideoViewed {
            user_id: user_id.to_string(),
            video_id: video_id.to_string(),
        },
    )
    .map_err(|e| StoreError::Validation(e.to_string()))?
    .with_trace_id(trace_id)
    .with_user_id(user_id);

    writer.write(&viewing_stream_name(video_id), &event, ExpectedVersion::Any)?;
    Ok(event.id)
}
