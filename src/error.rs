use serde::{Deserialize, Serialize};

use crate::remote::RemoteError;

/// Errors surfaced by [`InteractionStateManager`] operations.
///
/// `InvalidOperation`, `Validation`, `Unauthorized` and `NotFound` are
/// rejected synchronously, before any optimistic mutation or remote call;
/// the cache is never touched. `Remote` is the only kind discovered after an
/// optimistic mutation; it always arrives together with a completed rollback
/// and is reported through the event stream rather than a return value.
///
/// [`InteractionStateManager`]: crate::manager::InteractionStateManager
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum InteractionError {
    /// Malformed caller intent, e.g. a self-follow.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Payload validation failed, e.g. blank comment content.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The acting user does not own the targeted entity.
    #[error("unauthorized")]
    Unauthorized,

    /// The targeted post or comment is not present in the local cache.
    #[error("{0} not found")]
    NotFound(String),

    /// The backend rejected an already-applied optimistic mutation.
    /// The local state has been rolled back by the time this is observed.
    #[error("remote call failed: {0}")]
    Remote(#[from] RemoteError),
}
