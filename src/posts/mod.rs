use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::comments::Comment;
use crate::{PostId, UserId};

/// Cached view of a post: the denormalized like counter, the set of viewers
/// known to have liked it, and the ordered comment list.
///
/// Posts enter the cache through hydration; creating or deleting a post is
/// the REST collaborator's job (author-only, enforced remotely) and is not
/// an interaction this component performs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub caption: String,
    pub likes: i64,
    pub liked_by: HashSet<UserId>,
    pub comments: Vec<Comment>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Post {
    pub fn new(author_id: UserId, caption: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            author_id,
            caption: caption.into(),
            likes: 0,
            liked_by: HashSet::new(),
            comments: Vec::new(),
            created_at: chrono::Utc::now(),
        }
    }

    /// The like state a given viewer sees on this post.
    pub fn like_state(&self, viewer: UserId) -> LikeState {
        LikeState {
            viewer,
            post: self.id,
            liked: self.liked_by.contains(&viewer),
            likes: self.likes,
        }
    }
}

/// Per (viewer, post) like flag plus the post's denormalized counter.
///
/// The two fields mutate and roll back together; the counter never goes
/// negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub viewer: UserId,
    pub post: PostId,
    pub liked: bool,
    pub likes: i64,
}
