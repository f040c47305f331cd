use serde::{Deserialize, Serialize};

use crate::UserId;

/// Snapshot of a directed follow edge as the cache currently sees it.
///
/// Existence is boolean per (viewer, target) pair; there is no edge
/// metadata. The authoritative copy lives at the backend, this is the
/// optimistic local view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowState {
    pub viewer: UserId,
    pub target: UserId,
    pub following: bool,
}
