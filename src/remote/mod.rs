use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{CommentId, PostId, UserId};

pub mod mock;

/// Backend ack for a created comment: the remote-assigned id replaces the
/// client's temporary one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentAck {
    pub id: CommentId,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Failures reported by the remote collaborator.
///
/// Every variant is non-fatal to the interaction manager: it rolls the
/// optimistic mutation back and reports the error through the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RemoteError {
    /// The backend processed the request and said no.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The mock backend failed to load or persist its state.
    #[error("storage: {0}")]
    Storage(String),
}

/// The abstract REST/auth collaborator the interaction manager talks to.
///
/// All `set_*` calls are idempotent: retrying "set to true" when the edge
/// or like is already true must succeed. Wire format, transport, retries
/// and timeouts are this collaborator's concern, not the manager's.
#[async_trait]
pub trait RemoteSocialService: Send + Sync {
    async fn set_follow(
        &self,
        follower: UserId,
        followee: UserId,
        desired: bool,
    ) -> Result<(), RemoteError>;

    async fn set_like(
        &self,
        viewer: UserId,
        post: PostId,
        desired: bool,
    ) -> Result<(), RemoteError>;

    async fn create_comment(
        &self,
        post: PostId,
        author: UserId,
        content: &str,
    ) -> Result<CommentAck, RemoteError>;

    async fn update_comment(
        &self,
        post: PostId,
        comment: CommentId,
        content: &str,
    ) -> Result<(), RemoteError>;

    async fn delete_comment(&self, post: PostId, comment: CommentId) -> Result<(), RemoteError>;
}
