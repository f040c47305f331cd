use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{CommentId, UserId};

/// A comment as held in the local cache.
///
/// `is_editing` and `pending` are local-only UI flags and are never sent to
/// the backend. `pending` is true while the comment still carries its
/// locally assigned temporary id; the id and `created_at` are replaced once
/// the backend acks the create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub is_editing: bool,
    #[serde(default)]
    pub pending: bool,
}

impl Comment {
    /// An optimistic comment with a temporary local id, awaiting the remote
    /// ack.
    pub(crate) fn optimistic(author_id: UserId, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            content: content.into(),
            created_at: chrono::Utc::now(),
            is_editing: false,
            pending: true,
        }
    }
}

/// Payload for creating or editing a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CommentPayload {
    #[validate(length(
        min = 1,
        max = 10000,
        message = "Comment must be between 1 and 10000 characters"
    ))]
    pub content: String,
}

impl CommentPayload {
    /// Validates length bounds and rejects content that is blank after
    /// trimming whitespace.
    pub fn check(content: &str) -> Result<(), String> {
        if content.trim().is_empty() {
            return Err("Comment cannot be empty".to_string());
        }
        let payload = Self {
            content: content.to_string(),
        };
        payload.validate().map_err(|e| e.to_string())
    }
}
