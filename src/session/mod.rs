use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::UserId;

/// The identity bound to the current client session.
///
/// Established by the external auth collaborator at session start and
/// immutable until logout; the interaction core only ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewer {
    pub id: UserId,
    pub handle: String,
}

impl Viewer {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            handle: handle.into(),
        }
    }
}

/// Injected session capability, so the core is testable without a real
/// auth backend.
pub trait SessionProvider: Send + Sync {
    /// The viewer of the current session, or `None` when logged out.
    fn current_viewer(&self) -> Option<Viewer>;
}

/// A fixed session, used by tests and by embedders that resolve auth
/// elsewhere and hand the result in.
#[derive(Debug, Clone)]
pub struct StaticSession {
    viewer: Viewer,
}

impl StaticSession {
    pub fn new(viewer: Viewer) -> Self {
        Self { viewer }
    }
}

impl SessionProvider for StaticSession {
    fn current_viewer(&self) -> Option<Viewer> {
        Some(self.viewer.clone())
    }
}

/// Logged-out session.
#[derive(Debug, Clone, Default)]
pub struct AnonymousSession;

impl SessionProvider for AnonymousSession {
    fn current_viewer(&self) -> Option<Viewer> {
        None
    }
}
