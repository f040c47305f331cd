use std::collections::VecDeque;

use crate::comments::Comment;
use crate::{CommentId, PostId, UserId};

/// One queued unit of remote reconciliation work.
///
/// Sync jobs carry no payload: they read the cache when they run and issue
/// the call matching the net optimistic state at that moment, which is what
/// lets a superseded toggle coalesce instead of fighting the one queued
/// behind it. Comment jobs carry the data their rollback needs.
#[derive(Debug)]
pub(crate) enum Job {
    SyncFollow {
        viewer: UserId,
        target: UserId,
    },
    SyncLike {
        viewer: UserId,
        post: PostId,
    },
    CreateComment {
        post: PostId,
        temp_id: CommentId,
    },
    UpdateComment {
        post: PostId,
        comment: CommentId,
        prior_content: String,
        new_content: String,
    },
    DeleteComment {
        post: PostId,
        removed: Comment,
        index: usize,
    },
}

impl Job {
    /// Points a job queued behind a pending create at the remote-assigned
    /// id once the create acks. A delete's rollback snapshot is no longer
    /// pending at that point.
    pub fn retarget_comment(&mut self, from: CommentId, to: CommentId) {
        match self {
            Job::UpdateComment { comment, .. } if *comment == from => *comment = to,
            Job::DeleteComment { removed, .. } if removed.id == from => {
                removed.id = to;
                removed.pending = false;
            }
            _ => {}
        }
    }

    /// Whether this job acts on the given comment id.
    pub fn targets_comment(&self, id: CommentId) -> bool {
        match self {
            Job::UpdateComment { comment, .. } => *comment == id,
            Job::DeleteComment { removed, .. } => removed.id == id,
            _ => false,
        }
    }
}

/// The last state the backend acknowledged for an entity, restored on
/// rollback. Comment pipelines roll back per job and carry no baseline.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Baseline {
    Follow { following: bool },
    Like { liked: bool, likes: i64 },
    None,
}

/// Per-entity action pipeline: the pending queue behind the single
/// in-flight remote call, plus the rollback baseline.
#[derive(Debug)]
pub(crate) struct Pipeline {
    pub queue: VecDeque<Job>,
    pub baseline: Baseline,
}

impl Pipeline {
    pub fn starting_with(job: Job, baseline: Baseline) -> Self {
        Self {
            queue: VecDeque::from([job]),
            baseline,
        }
    }
}
