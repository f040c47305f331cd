//! Client-side interaction core for the Snapverse photo-sharing app.
//!
//! Everything here revolves around [`InteractionStateManager`]: it owns the
//! local cache of posts and follow edges, applies follow/like/comment
//! actions optimistically, talks to an injected [`RemoteSocialService`],
//! and rolls back exactly to the last backend-acknowledged state when a
//! call is rejected. Routing, rendering, auth and storage live in external
//! collaborators; see the session and remote modules for their seams.
//!
//! [`InteractionStateManager`]: manager::InteractionStateManager
//! [`RemoteSocialService`]: remote::RemoteSocialService

use uuid::Uuid;

pub mod comments;
pub mod config;
pub mod error;
pub mod follows;
pub mod manager;
pub mod posts;
pub mod remote;
pub mod session;

mod store;

/// Opaque user identity, assigned by the auth collaborator.
pub type UserId = Uuid;
/// Post identity, assigned by the backend.
pub type PostId = Uuid;
/// Comment identity; temporary (local) until the backend acks the create.
pub type CommentId = Uuid;

pub use comments::Comment;
pub use error::InteractionError;
pub use follows::FollowState;
pub use manager::{EntityKey, InteractionEvent, InteractionStateManager, StateSnapshot, UpdatePhase};
pub use posts::{LikeState, Post};
pub use remote::{CommentAck, RemoteError, RemoteSocialService};
pub use session::{SessionProvider, StaticSession, Viewer};
