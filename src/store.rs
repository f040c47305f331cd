use std::collections::{HashMap, HashSet};

use crate::comments::Comment;
use crate::posts::{LikeState, Post};
use crate::{PostId, UserId};

/// The owned client-side cache of posts and follow edges.
///
/// Only the interaction manager mutates this; everything it hands out is a
/// clone, never a reference, so the optimistic/rollback invariant cannot be
/// bypassed from outside.
#[derive(Debug, Default)]
pub(crate) struct Store {
    posts: HashMap<PostId, Post>,
    follows: HashSet<(UserId, UserId)>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // --- follow edges ---

    pub fn is_following(&self, viewer: UserId, target: UserId) -> bool {
        self.follows.contains(&(viewer, target))
    }

    /// Idempotent set, like an upsert/delete on the backing follows table.
    pub fn set_following(&mut self, viewer: UserId, target: UserId, desired: bool) {
        if desired {
            self.follows.insert((viewer, target));
        } else {
            self.follows.remove(&(viewer, target));
        }
    }

    // --- posts & likes ---

    pub fn upsert_post(&mut self, post: Post) {
        self.posts.insert(post.id, post);
    }

    pub fn post(&self, id: PostId) -> Option<&Post> {
        self.posts.get(&id)
    }

    pub fn like_state(&self, viewer: UserId, post: PostId) -> Option<LikeState> {
        self.posts.get(&post).map(|p| p.like_state(viewer))
    }

    /// Sets the viewer's like flag and adjusts the denormalized counter in
    /// the same step. Returns the resulting state, or `None` for an unknown
    /// post. A no-op when the flag already matches.
    pub fn apply_like(&mut self, viewer: UserId, post: PostId, desired: bool) -> Option<LikeState> {
        let p = self.posts.get_mut(&post)?;
        let changed = if desired {
            p.liked_by.insert(viewer)
        } else {
            p.liked_by.remove(&viewer)
        };
        if changed {
            if desired {
                p.likes += 1;
            } else {
                p.likes = (p.likes - 1).max(0);
            }
        }
        Some(p.like_state(viewer))
    }

    /// Restores both halves of a like state at once.
    pub fn restore_like(
        &mut self,
        viewer: UserId,
        post: PostId,
        liked: bool,
        likes: i64,
    ) -> Option<LikeState> {
        let p = self.posts.get_mut(&post)?;
        if liked {
            p.liked_by.insert(viewer);
        } else {
            p.liked_by.remove(&viewer);
        }
        p.likes = likes.max(0);
        Some(p.like_state(viewer))
    }

    // --- comments ---

    pub fn comments(&self, post: PostId) -> Option<&[Comment]> {
        self.posts.get(&post).map(|p| p.comments.as_slice())
    }

    pub fn comment(&self, post: PostId, id: crate::CommentId) -> Option<&Comment> {
        self.posts.get(&post)?.comments.iter().find(|c| c.id == id)
    }

    pub fn comment_mut(&mut self, post: PostId, id: crate::CommentId) -> Option<&mut Comment> {
        self.posts
            .get_mut(&post)?
            .comments
            .iter_mut()
            .find(|c| c.id == id)
    }

    pub fn push_comment(&mut self, post: PostId, comment: Comment) -> bool {
        match self.posts.get_mut(&post) {
            Some(p) => {
                p.comments.push(comment);
                true
            }
            None => false,
        }
    }

    /// Removes a comment, reporting the index it occupied so a rollback can
    /// put it back in display order.
    pub fn remove_comment(
        &mut self,
        post: PostId,
        id: crate::CommentId,
    ) -> Option<(usize, Comment)> {
        let p = self.posts.get_mut(&post)?;
        let idx = p.comments.iter().position(|c| c.id == id)?;
        Some((idx, p.comments.remove(idx)))
    }

    pub fn insert_comment_at(&mut self, post: PostId, index: usize, comment: Comment) {
        if let Some(p) = self.posts.get_mut(&post) {
            let index = index.min(p.comments.len());
            p.comments.insert(index, comment);
        }
    }
}
