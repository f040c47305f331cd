use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::settings::Settings;
use crate::remote::{CommentAck, RemoteError, RemoteSocialService};
use crate::{CommentId, PostId, UserId};

/// Record kept by the mock backend for a post's social state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MockPost {
    liked_by: HashSet<UserId>,
    comments: Vec<MockComment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MockComment {
    id: CommentId,
    author_id: UserId,
    content: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MockState {
    follows: HashSet<(UserId, UserId)>,
    posts: HashMap<PostId, MockPost>,
}

/// In-process stand-in for the real social backend.
///
/// State lives in memory and, when a data path is configured, is mirrored
/// to a JSON file after every mutation so it survives restarts. Post
/// records are created on demand; `set_*` and `delete_comment` are
/// idempotent. Failures are injected explicitly with [`fail_next`], which
/// keeps the rollback paths deterministic under test.
///
/// [`fail_next`]: MockSocialService::fail_next
pub struct MockSocialService {
    state: Mutex<MockState>,
    planned_failures: Mutex<VecDeque<RemoteError>>,
    latency: Duration,
    data_path: Option<PathBuf>,
    calls: AtomicU64,
}

impl MockSocialService {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let state = settings
            .data_path
            .as_deref()
            .and_then(|path| std::fs::read(path).ok())
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();

        Self {
            state: Mutex::new(state),
            planned_failures: Mutex::new(VecDeque::new()),
            latency: settings.remote_latency,
            data_path: settings.data_path,
            calls: AtomicU64::new(0),
        }
    }

    /// Queues an error for an upcoming call. Each queued error consumes
    /// exactly one call, in order.
    pub fn fail_next(&self, error: RemoteError) {
        self.planned_failures
            .lock()
            .expect("failure queue poisoned")
            .push_back(error);
    }

    /// Total remote calls attempted, including injected failures.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether the backend currently records the edge. Test inspection
    /// helper.
    pub fn records_follow(&self, follower: UserId, followee: UserId) -> bool {
        self.state
            .lock()
            .expect("mock state poisoned")
            .follows
            .contains(&(follower, followee))
    }

    /// How many likes the backend currently records for the post.
    pub fn recorded_likes(&self, post: PostId) -> usize {
        self.state
            .lock()
            .expect("mock state poisoned")
            .posts
            .get(&post)
            .map(|p| p.liked_by.len())
            .unwrap_or(0)
    }

    /// How many comments the backend currently records for the post.
    pub fn recorded_comments(&self, post: PostId) -> usize {
        self.state
            .lock()
            .expect("mock state poisoned")
            .posts
            .get(&post)
            .map(|p| p.comments.len())
            .unwrap_or(0)
    }

    /// Applies latency, counts the call and pops a planned failure if one
    /// is queued.
    async fn begin_call(&self) -> Result<(), RemoteError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        let planned = self
            .planned_failures
            .lock()
            .expect("failure queue poisoned")
            .pop_front();
        match planned {
            Some(err) => {
                tracing::debug!(%err, "mock backend: injected failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn persist(&self, state: &MockState) -> Result<(), RemoteError> {
        let Some(path) = &self.data_path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| RemoteError::Storage(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| RemoteError::Storage(e.to_string()))
    }
}

impl Default for MockSocialService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteSocialService for MockSocialService {
    async fn set_follow(
        &self,
        follower: UserId,
        followee: UserId,
        desired: bool,
    ) -> Result<(), RemoteError> {
        self.begin_call().await?;
        let mut state = self.state.lock().expect("mock state poisoned");
        if desired {
            state.follows.insert((follower, followee));
        } else {
            state.follows.remove(&(follower, followee));
        }
        self.persist(&state)
    }

    async fn set_like(
        &self,
        viewer: UserId,
        post: PostId,
        desired: bool,
    ) -> Result<(), RemoteError> {
        self.begin_call().await?;
        let mut state = self.state.lock().expect("mock state poisoned");
        let record = state.posts.entry(post).or_default();
        if desired {
            record.liked_by.insert(viewer);
        } else {
            record.liked_by.remove(&viewer);
        }
        self.persist(&state)
    }

    async fn create_comment(
        &self,
        post: PostId,
        author: UserId,
        content: &str,
    ) -> Result<CommentAck, RemoteError> {
        self.begin_call().await?;
        let ack = CommentAck {
            id: Uuid::new_v4(),
            created_at: chrono::Utc::now(),
        };
        let mut state = self.state.lock().expect("mock state poisoned");
        state.posts.entry(post).or_default().comments.push(MockComment {
            id: ack.id,
            author_id: author,
            content: content.to_string(),
            created_at: ack.created_at,
        });
        self.persist(&state)?;
        Ok(ack)
    }

    async fn update_comment(
        &self,
        post: PostId,
        comment: CommentId,
        content: &str,
    ) -> Result<(), RemoteError> {
        self.begin_call().await?;
        let mut state = self.state.lock().expect("mock state poisoned");
        let record = state
            .posts
            .get_mut(&post)
            .ok_or_else(|| RemoteError::Rejected("post not found".to_string()))?;
        let target = record
            .comments
            .iter_mut()
            .find(|c| c.id == comment)
            .ok_or_else(|| RemoteError::Rejected("comment not found".to_string()))?;
        target.content = content.to_string();
        self.persist(&state)
    }

    async fn delete_comment(&self, post: PostId, comment: CommentId) -> Result<(), RemoteError> {
        self.begin_call().await?;
        let mut state = self.state.lock().expect("mock state poisoned");
        // Deleting an id the backend never saw is fine; the call is
        // idempotent.
        if let Some(record) = state.posts.get_mut(&post) {
            record.comments.retain(|c| c.id != comment);
        }
        self.persist(&state)
    }
}
