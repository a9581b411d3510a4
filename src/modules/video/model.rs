use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::dto::VideoDraft;

#[derive(Debug, Serialize, Deserialize, FromRow, Validate, Clone, PartialEq)]
pub struct Video {
    #[serde(rename = "encoded_video_folder")]
    #[validate(custom(function = "validate_uuid"))]
    pub id: Uuid,
    #[validate(length(min = 1, message = "video resource id can't be empty"))]
    pub resource_id: String,
    #[validate(length(min = 1, message = "video file path can't be empty"))]
    pub file_path: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Video {
    /// Builds a video from an inbound draft and assigns it a fresh id.
    pub fn from_draft(draft: VideoDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource_id: draft.resource_id,
            file_path: draft.file_path,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// The nil uuid is what an unassigned id looks like.
pub(crate) fn validate_uuid(id: &Uuid) -> Result<(), ValidationError> {
    if id.is_nil() {
        return Err(ValidationError::new("uuid").with_message(Cow::Borrowed("id must be a valid uuid")));
    }
    Ok(())
}
