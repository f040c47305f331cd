use serde::Serialize;

use crate::comments::Comment;
use crate::error::InteractionError;
use crate::follows::FollowState;
use crate::posts::LikeState;
use crate::{PostId, UserId};

/// The entity an action pipeline serializes on.
///
/// Actions on the same key queue behind each other (at most one in-flight
/// remote call); actions on different keys are fully independent. Comment
/// actions key on the post, since the comment *list* is the mutated entity
/// and delete/re-insert bookkeeping must not race a concurrent add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityKey {
    Follow { viewer: UserId, target: UserId },
    Like { viewer: UserId, post: PostId },
    Comments { post: PostId },
}

/// Where in the Idle → Optimistic → {Confirmed | RolledBack} cycle a state
/// notification was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePhase {
    /// Local mutation applied, remote call not yet resolved.
    Optimistic,
    /// The backend accepted the optimistic state.
    Confirmed,
    /// The backend rejected it; the cache is back at the last acknowledged
    /// state.
    RolledBack,
}

/// The new state carried by a notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateSnapshot {
    Follow(FollowState),
    Like(LikeState),
    Comments(Vec<Comment>),
}

/// Notifications delivered to UI subscribers.
///
/// `StateChanged` fires synchronously for optimistic updates and
/// asynchronously for confirmations and rollbacks. `ActionFailed` always
/// follows a `RolledBack` state change and carries both the state that was
/// attempted and the state the rollback restored, so the UI can re-render
/// consistently while showing the error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionEvent {
    StateChanged {
        entity: EntityKey,
        phase: UpdatePhase,
        state: StateSnapshot,
    },
    ActionFailed {
        entity: EntityKey,
        error: InteractionError,
        attempted: StateSnapshot,
        restored: StateSnapshot,
    },
}
