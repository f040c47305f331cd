use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, Notify};
use tracing::{debug, error};

use crate::comments::{Comment, CommentPayload};
use crate::error::InteractionError;
use crate::follows::FollowState;
use crate::posts::{LikeState, Post};
use crate::remote::RemoteSocialService;
use crate::session::{AnonymousSession, SessionProvider, Viewer};
use crate::store::Store;
use crate::{CommentId, PostId, UserId};

pub mod events;
mod queue;

pub use events::{EntityKey, InteractionEvent, StateSnapshot, UpdatePhase};

use queue::{Baseline, Job, Pipeline};

const EVENT_CAPACITY: usize = 128;

/// Applies optimistic local mutations for follow, like and comment actions,
/// dispatches the matching remote call, and reconciles when it resolves.
///
/// Every operation validates and authorizes synchronously, mutates the
/// owned cache, notifies subscribers, and returns the new state before any
/// network traffic happens. The remote call runs on a per-entity pipeline
/// task: at most one call is in flight per entity, later actions on the
/// same entity queue behind it, and actions on different entities proceed
/// independently. A rejected call rolls the cache back to the last state
/// the backend acknowledged and reports a typed error through the event
/// stream; no failure is ever fatal to the manager.
///
/// Operations must be invoked from within a Tokio runtime; pipeline tasks
/// are spawned onto it. Cheap to clone; clones share the same cache and
/// pipelines.
#[derive(Clone)]
pub struct InteractionStateManager {
    inner: Arc<Inner>,
}

struct Inner {
    store: Mutex<Store>,
    pipelines: Mutex<HashMap<EntityKey, Pipeline>>,
    remote: Arc<dyn RemoteSocialService>,
    session: Arc<dyn SessionProvider>,
    events: broadcast::Sender<InteractionEvent>,
    idle: Notify,
}

impl InteractionStateManager {
    pub fn new(remote: Arc<dyn RemoteSocialService>) -> Self {
        Self::with_session(remote, Arc::new(AnonymousSession))
    }

    pub fn with_session(
        remote: Arc<dyn RemoteSocialService>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(Store::new()),
                pipelines: Mutex::new(HashMap::new()),
                remote,
                session,
                events,
                idle: Notify::new(),
            }),
        }
    }

    /// Subscribes to state-change and action-failed notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<InteractionEvent> {
        self.inner.events.subscribe()
    }

    /// The viewer of the current session, if any.
    pub fn session_viewer(&self) -> Option<Viewer> {
        self.inner.session.current_viewer()
    }

    // --- cache hydration & reads ---

    /// Primes the cache with a post fetched from the authoritative backend.
    pub fn hydrate_post(&self, post: Post) {
        self.inner.store().upsert_post(post);
    }

    /// Primes the cache with a follow edge fetched from the backend.
    pub fn hydrate_follow(&self, viewer: UserId, target: UserId, following: bool) {
        self.inner.store().set_following(viewer, target, following);
    }

    pub fn is_following(&self, viewer: UserId, target: UserId) -> bool {
        self.inner.store().is_following(viewer, target)
    }

    pub fn like_state(&self, viewer: UserId, post: PostId) -> Option<LikeState> {
        self.inner.store().like_state(viewer, post)
    }

    pub fn post(&self, id: PostId) -> Option<Post> {
        self.inner.store().post(id).cloned()
    }

    pub fn comments(&self, post: PostId) -> Option<Vec<Comment>> {
        self.inner.store().comments(post).map(|c| c.to_vec())
    }

    // --- follow ---

    /// Flips the cached follow edge and returns the new state immediately;
    /// the matching remote call is issued on the edge's pipeline.
    ///
    /// Self-follow is the caller's mistake and is rejected before any
    /// mutation.
    pub fn toggle_follow(
        &self,
        viewer: UserId,
        target: UserId,
    ) -> Result<FollowState, InteractionError> {
        if viewer == target {
            return Err(InteractionError::InvalidOperation(
                "you cannot follow yourself".to_string(),
            ));
        }

        let key = EntityKey::Follow { viewer, target };
        let (prior, state) = {
            let mut store = self.inner.store();
            let prior = store.is_following(viewer, target);
            store.set_following(viewer, target, !prior);
            (
                prior,
                FollowState {
                    viewer,
                    target,
                    following: !prior,
                },
            )
        };
        debug!(%viewer, %target, following = state.following, "follow toggled optimistically");

        self.inner.publish_state(
            key,
            UpdatePhase::Optimistic,
            StateSnapshot::Follow(state.clone()),
        );
        self.inner.enqueue(
            key,
            Job::SyncFollow { viewer, target },
            Baseline::Follow { following: prior },
        );
        Ok(state)
    }

    // --- like ---

    /// Flips the viewer's like flag and adjusts the post's counter in the
    /// same step, returning the new state immediately.
    pub fn toggle_like(&self, viewer: UserId, post: PostId) -> Result<LikeState, InteractionError> {
        let key = EntityKey::Like { viewer, post };
        let (prior, state) = {
            let mut store = self.inner.store();
            let prior = store
                .like_state(viewer, post)
                .ok_or_else(|| InteractionError::NotFound("post".to_string()))?;
            let state = store
                .apply_like(viewer, post, !prior.liked)
                .ok_or_else(|| InteractionError::NotFound("post".to_string()))?;
            (prior, state)
        };
        debug!(%viewer, %post, liked = state.liked, likes = state.likes, "like toggled optimistically");

        self.inner.publish_state(
            key,
            UpdatePhase::Optimistic,
            StateSnapshot::Like(state.clone()),
        );
        self.inner.enqueue(
            key,
            Job::SyncLike { viewer, post },
            Baseline::Like {
                liked: prior.liked,
                likes: prior.likes,
            },
        );
        Ok(state)
    }

    // --- comments ---

    /// Appends a locally-identified comment and returns it immediately; the
    /// temporary id is replaced once the backend acks the create.
    pub fn add_comment(
        &self,
        post: PostId,
        author: UserId,
        content: &str,
    ) -> Result<Comment, InteractionError> {
        CommentPayload::check(content).map_err(InteractionError::Validation)?;

        let key = EntityKey::Comments { post };
        let comment = Comment::optimistic(author, content);
        {
            let mut store = self.inner.store();
            if !store.push_comment(post, comment.clone()) {
                return Err(InteractionError::NotFound("post".to_string()));
            }
        }
        debug!(%post, comment = %comment.id, "comment appended optimistically");

        self.inner.publish_comments(key, UpdatePhase::Optimistic, post);
        self.inner.enqueue(
            key,
            Job::CreateComment {
                post,
                temp_id: comment.id,
            },
            Baseline::None,
        );
        Ok(comment)
    }

    /// Rewrites a comment's content. Editing someone else's comment is
    /// `Unauthorized`; submitting the text unchanged is a no-op that issues
    /// no remote call.
    pub fn edit_comment(
        &self,
        post: PostId,
        comment: CommentId,
        new_content: &str,
        requester: UserId,
    ) -> Result<Comment, InteractionError> {
        let key = EntityKey::Comments { post };
        let (updated, prior_content) = {
            let mut store = self.inner.store();
            let current = store
                .comment(post, comment)
                .ok_or_else(|| InteractionError::NotFound("comment".to_string()))?;
            if current.author_id != requester {
                return Err(InteractionError::Unauthorized);
            }
            CommentPayload::check(new_content).map_err(InteractionError::Validation)?;
            if current.content == new_content {
                return Ok(current.clone());
            }

            let target = store
                .comment_mut(post, comment)
                .ok_or_else(|| InteractionError::NotFound("comment".to_string()))?;
            let prior = std::mem::replace(&mut target.content, new_content.to_string());
            target.is_editing = false;
            (target.clone(), prior)
        };
        debug!(%post, %comment, "comment edited optimistically");

        self.inner.publish_comments(key, UpdatePhase::Optimistic, post);
        self.inner.enqueue(
            key,
            Job::UpdateComment {
                post,
                comment,
                prior_content,
                new_content: new_content.to_string(),
            },
            Baseline::None,
        );
        Ok(updated)
    }

    /// Removes a comment, remembering where it sat so a rollback restores
    /// display order.
    pub fn delete_comment(
        &self,
        post: PostId,
        comment: CommentId,
        requester: UserId,
    ) -> Result<(), InteractionError> {
        let key = EntityKey::Comments { post };
        let (index, removed) = {
            let mut store = self.inner.store();
            let current = store
                .comment(post, comment)
                .ok_or_else(|| InteractionError::NotFound("comment".to_string()))?;
            if current.author_id != requester {
                return Err(InteractionError::Unauthorized);
            }
            store
                .remove_comment(post, comment)
                .ok_or_else(|| InteractionError::NotFound("comment".to_string()))?
        };
        debug!(%post, %comment, index, "comment removed optimistically");

        self.inner.publish_comments(key, UpdatePhase::Optimistic, post);
        self.inner.enqueue(
            key,
            Job::DeleteComment {
                post,
                removed,
                index,
            },
            Baseline::None,
        );
        Ok(())
    }

    /// Marks a comment as being edited. Local-only; no remote call.
    pub fn begin_edit(
        &self,
        post: PostId,
        comment: CommentId,
        requester: UserId,
    ) -> Result<Comment, InteractionError> {
        self.set_editing(post, comment, requester, true)
    }

    /// Leaves edit mode without changing content. Local-only; no remote
    /// call.
    pub fn cancel_edit(
        &self,
        post: PostId,
        comment: CommentId,
        requester: UserId,
    ) -> Result<Comment, InteractionError> {
        self.set_editing(post, comment, requester, false)
    }

    fn set_editing(
        &self,
        post: PostId,
        comment: CommentId,
        requester: UserId,
        editing: bool,
    ) -> Result<Comment, InteractionError> {
        let updated = {
            let mut store = self.inner.store();
            let current = store
                .comment(post, comment)
                .ok_or_else(|| InteractionError::NotFound("comment".to_string()))?;
            if current.author_id != requester {
                return Err(InteractionError::Unauthorized);
            }
            let target = store
                .comment_mut(post, comment)
                .ok_or_else(|| InteractionError::NotFound("comment".to_string()))?;
            target.is_editing = editing;
            target.clone()
        };
        self.inner
            .publish_comments(EntityKey::Comments { post }, UpdatePhase::Optimistic, post);
        Ok(updated)
    }

    // --- session-resolved conveniences ---

    /// [`toggle_follow`] with the viewer taken from the session provider.
    ///
    /// [`toggle_follow`]: Self::toggle_follow
    pub fn toggle_follow_as_viewer(&self, target: UserId) -> Result<FollowState, InteractionError> {
        let viewer = self.require_session()?;
        self.toggle_follow(viewer.id, target)
    }

    /// [`toggle_like`] with the viewer taken from the session provider.
    ///
    /// [`toggle_like`]: Self::toggle_like
    pub fn toggle_like_as_viewer(&self, post: PostId) -> Result<LikeState, InteractionError> {
        let viewer = self.require_session()?;
        self.toggle_like(viewer.id, post)
    }

    /// [`add_comment`] with the author taken from the session provider.
    ///
    /// [`add_comment`]: Self::add_comment
    pub fn add_comment_as_viewer(
        &self,
        post: PostId,
        content: &str,
    ) -> Result<Comment, InteractionError> {
        let viewer = self.require_session()?;
        self.add_comment(post, viewer.id, content)
    }

    fn require_session(&self) -> Result<Viewer, InteractionError> {
        self.inner
            .session
            .current_viewer()
            .ok_or_else(|| InteractionError::InvalidOperation("no active session".to_string()))
    }

    /// Waits until every pipeline has drained: all issued remote calls have
    /// resolved and been reconciled. Primarily for tests and shutdown.
    pub async fn flush(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self
                .inner
                .pipelines
                .lock()
                .expect("pipeline map poisoned")
                .is_empty()
            {
                return;
            }
            notified.await;
        }
    }
}

impl Inner {
    fn store(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().expect("store lock poisoned")
    }

    fn publish(&self, event: InteractionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn publish_state(&self, entity: EntityKey, phase: UpdatePhase, state: StateSnapshot) {
        self.publish(InteractionEvent::StateChanged {
            entity,
            phase,
            state,
        });
    }

    fn publish_comments(&self, entity: EntityKey, phase: UpdatePhase, post: PostId) {
        let snapshot = self.comments_snapshot(post);
        self.publish_state(entity, phase, StateSnapshot::Comments(snapshot));
    }

    fn comments_snapshot(&self, post: PostId) -> Vec<Comment> {
        self.store()
            .comments(post)
            .map(|c| c.to_vec())
            .unwrap_or_default()
    }

    /// Queues a job on the entity's pipeline, creating the pipeline (and
    /// its worker task) if the entity was idle. The baseline only takes
    /// effect on creation: an existing pipeline already tracks the last
    /// remote-acknowledged state.
    fn enqueue(self: &Arc<Self>, key: EntityKey, job: Job, baseline: Baseline) {
        let mut pipelines = self.pipelines.lock().expect("pipeline map poisoned");
        match pipelines.entry(key) {
            Entry::Occupied(mut occupied) => occupied.get_mut().queue.push_back(job),
            Entry::Vacant(vacant) => {
                vacant.insert(Pipeline::starting_with(job, baseline));
                let inner = Arc::clone(self);
                tokio::spawn(async move {
                    inner.run_pipeline(key).await;
                });
            }
        }
    }

    fn baseline(&self, key: &EntityKey) -> Baseline {
        self.pipelines
            .lock()
            .expect("pipeline map poisoned")
            .get(key)
            .map(|p| p.baseline)
            .unwrap_or(Baseline::None)
    }

    fn set_baseline(&self, key: &EntityKey, baseline: Baseline) {
        if let Some(p) = self
            .pipelines
            .lock()
            .expect("pipeline map poisoned")
            .get_mut(key)
        {
            p.baseline = baseline;
        }
    }

    async fn run_pipeline(self: Arc<Self>, key: EntityKey) {
        loop {
            let job = {
                let mut pipelines = self.pipelines.lock().expect("pipeline map poisoned");
                let Some(pipeline) = pipelines.get_mut(&key) else {
                    break;
                };
                match pipeline.queue.pop_front() {
                    Some(job) => job,
                    None => {
                        pipelines.remove(&key);
                        self.idle.notify_waiters();
                        break;
                    }
                }
            };
            self.run_job(key, job).await;
        }
    }

    async fn run_job(&self, key: EntityKey, job: Job) {
        match job {
            Job::SyncFollow { viewer, target } => self.sync_follow(key, viewer, target).await,
            Job::SyncLike { viewer, post } => self.sync_like(key, viewer, post).await,
            Job::CreateComment { post, temp_id } => self.create_comment(key, post, temp_id).await,
            Job::UpdateComment {
                post,
                comment,
                prior_content,
                new_content,
            } => {
                self.update_comment(key, post, comment, prior_content, new_content)
                    .await
            }
            Job::DeleteComment {
                post,
                removed,
                index,
            } => self.delete_comment(key, post, removed, index).await,
        }
    }

    async fn sync_follow(&self, key: EntityKey, viewer: UserId, target: UserId) {
        // Desired state is whatever the cache holds now, so a toggle queued
        // behind a superseded one ends up re-asserting the final state.
        let desired = self.store().is_following(viewer, target);

        match self.remote.set_follow(viewer, target, desired).await {
            Ok(()) => {
                self.set_baseline(&key, Baseline::Follow { following: desired });
                self.publish_state(
                    key,
                    UpdatePhase::Confirmed,
                    StateSnapshot::Follow(FollowState {
                        viewer,
                        target,
                        following: desired,
                    }),
                );
            }
            Err(err) => {
                error!(%viewer, %target, %err, "follow sync rejected, rolling back");
                let confirmed = match self.baseline(&key) {
                    Baseline::Follow { following } => following,
                    _ => !desired,
                };
                let attempted = FollowState {
                    viewer,
                    target,
                    following: desired,
                };
                let restored = {
                    let mut store = self.store();
                    store.set_following(viewer, target, confirmed);
                    FollowState {
                        viewer,
                        target,
                        following: confirmed,
                    }
                };
                self.publish_state(
                    key,
                    UpdatePhase::RolledBack,
                    StateSnapshot::Follow(restored.clone()),
                );
                self.publish(InteractionEvent::ActionFailed {
                    entity: key,
                    error: err.into(),
                    attempted: StateSnapshot::Follow(attempted),
                    restored: StateSnapshot::Follow(restored),
                });
            }
        }
    }

    async fn sync_like(&self, key: EntityKey, viewer: UserId, post: PostId) {
        let Some(attempted) = self.store().like_state(viewer, post) else {
            return;
        };

        match self.remote.set_like(viewer, post, attempted.liked).await {
            Ok(()) => {
                if let Some(state) = self.store().like_state(viewer, post) {
                    self.set_baseline(
                        &key,
                        Baseline::Like {
                            liked: state.liked,
                            likes: state.likes,
                        },
                    );
                    self.publish_state(key, UpdatePhase::Confirmed, StateSnapshot::Like(state));
                }
            }
            Err(err) => {
                error!(%viewer, %post, %err, "like sync rejected, rolling back");
                let (liked, likes) = match self.baseline(&key) {
                    Baseline::Like { liked, likes } => (liked, likes),
                    _ => (attempted.liked, attempted.likes),
                };
                let restored = self.store().restore_like(viewer, post, liked, likes);
                if let Some(restored) = restored {
                    self.publish_state(
                        key,
                        UpdatePhase::RolledBack,
                        StateSnapshot::Like(restored.clone()),
                    );
                    self.publish(InteractionEvent::ActionFailed {
                        entity: key,
                        error: err.into(),
                        attempted: StateSnapshot::Like(attempted),
                        restored: StateSnapshot::Like(restored),
                    });
                }
            }
        }
    }

    async fn create_comment(&self, key: EntityKey, post: PostId, temp_id: CommentId) {
        // Content is read at run time: an edit applied while this create
        // was queued is what gets persisted.
        let Some(snapshot) = self.store().comment(post, temp_id).cloned() else {
            debug!(%post, %temp_id, "optimistic comment gone before create ran, skipping");
            // The backend never saw this id; anything still queued against
            // it must not run, or a failed delete would re-insert a comment
            // that exists nowhere remotely.
            let mut pipelines = self.pipelines.lock().expect("pipeline map poisoned");
            if let Some(pipeline) = pipelines.get_mut(&key) {
                pipeline.queue.retain(|job| !job.targets_comment(temp_id));
            }
            return;
        };

        match self
            .remote
            .create_comment(post, snapshot.author_id, &snapshot.content)
            .await
        {
            Ok(ack) => {
                {
                    let mut store = self.store();
                    if let Some(c) = store.comment_mut(post, temp_id) {
                        c.id = ack.id;
                        c.created_at = ack.created_at;
                        c.pending = false;
                    }
                }
                // Anything queued against the temporary id now targets the
                // real one.
                {
                    let mut pipelines = self.pipelines.lock().expect("pipeline map poisoned");
                    if let Some(pipeline) = pipelines.get_mut(&key) {
                        for job in pipeline.queue.iter_mut() {
                            job.retarget_comment(temp_id, ack.id);
                        }
                    }
                }
                self.publish_comments(key, UpdatePhase::Confirmed, post);
            }
            Err(err) => {
                error!(%post, %temp_id, %err, "comment create rejected, removing optimistic comment");
                let attempted = self.comments_snapshot(post);
                self.store().remove_comment(post, temp_id);
                let restored = self.comments_snapshot(post);
                self.publish_state(
                    key,
                    UpdatePhase::RolledBack,
                    StateSnapshot::Comments(restored.clone()),
                );
                self.publish(InteractionEvent::ActionFailed {
                    entity: key,
                    error: err.into(),
                    attempted: StateSnapshot::Comments(attempted),
                    restored: StateSnapshot::Comments(restored),
                });
            }
        }
    }

    async fn update_comment(
        &self,
        key: EntityKey,
        post: PostId,
        comment: CommentId,
        prior_content: String,
        new_content: String,
    ) {
        match self.remote.update_comment(post, comment, &new_content).await {
            Ok(()) => self.publish_comments(key, UpdatePhase::Confirmed, post),
            Err(err) => {
                error!(%post, %comment, %err, "comment edit rejected, restoring draft");
                let attempted = self.comments_snapshot(post);
                {
                    let mut store = self.store();
                    if let Some(c) = store.comment_mut(post, comment) {
                        // Don't clobber a newer optimistic edit queued
                        // behind this one.
                        if c.content == new_content {
                            c.content = prior_content;
                            c.is_editing = true;
                        }
                    }
                }
                let restored = self.comments_snapshot(post);
                self.publish_state(
                    key,
                    UpdatePhase::RolledBack,
                    StateSnapshot::Comments(restored.clone()),
                );
                self.publish(InteractionEvent::ActionFailed {
                    entity: key,
                    error: err.into(),
                    attempted: StateSnapshot::Comments(attempted),
                    restored: StateSnapshot::Comments(restored),
                });
            }
        }
    }

    async fn delete_comment(&self, key: EntityKey, post: PostId, removed: Comment, index: usize) {
        match self.remote.delete_comment(post, removed.id).await {
            Ok(()) => self.publish_comments(key, UpdatePhase::Confirmed, post),
            Err(err) => {
                error!(%post, comment = %removed.id, %err, "comment delete rejected, re-inserting");
                let attempted = self.comments_snapshot(post);
                self.store().insert_comment_at(post, index, removed);
                let restored = self.comments_snapshot(post);
                self.publish_state(
                    key,
                    UpdatePhase::RolledBack,
                    StateSnapshot::Comments(restored.clone()),
                );
                self.publish(InteractionEvent::ActionFailed {
                    entity: key,
                    error: err.into(),
                    attempted: StateSnapshot::Comments(attempted),
                    restored: StateSnapshot::Comments(restored),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::MockSocialService;
    use crate::remote::RemoteError;
    use crate::session::StaticSession;
    use uuid::Uuid;

    fn manager() -> (InteractionStateManager, Arc<MockSocialService>) {
        let remote = Arc::new(MockSocialService::new());
        let manager = InteractionStateManager::new(remote.clone());
        (manager, remote)
    }

    fn seeded_post(manager: &InteractionStateManager, author: UserId) -> PostId {
        let post = Post::new(author, "golden hour");
        let id = post.id;
        manager.hydrate_post(post);
        id
    }

    #[tokio::test]
    async fn self_follow_is_rejected_without_touching_state() {
        let (manager, remote) = manager();
        let viewer = Uuid::new_v4();

        let err = manager.toggle_follow(viewer, viewer).unwrap_err();
        assert!(matches!(err, InteractionError::InvalidOperation(_)));
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn blank_comment_is_rejected_without_a_remote_call() {
        let (manager, remote) = manager();
        let author = Uuid::new_v4();
        let post = seeded_post(&manager, author);

        let err = manager.add_comment(post, author, "   ").unwrap_err();
        assert!(matches!(err, InteractionError::Validation(_)));
        assert_eq!(manager.comments(post).unwrap().len(), 0);
        manager.flush().await;
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn edit_with_identical_content_is_a_noop() {
        let (manager, remote) = manager();
        let author = Uuid::new_v4();
        let post = seeded_post(&manager, author);

        let comment = manager.add_comment(post, author, "love this").unwrap();
        manager.flush().await;
        let calls_after_add = remote.call_count();

        let persisted = manager.comments(post).unwrap()[0].clone();
        let unchanged = manager
            .edit_comment(post, persisted.id, "love this", author)
            .unwrap();
        manager.flush().await;

        assert_eq!(unchanged.content, comment.content);
        assert_eq!(remote.call_count(), calls_after_add);
    }

    #[tokio::test]
    async fn non_author_edit_is_unauthorized_and_content_untouched() {
        let (manager, _remote) = manager();
        let author = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let post = seeded_post(&manager, author);

        manager.add_comment(post, author, "my caption").unwrap();
        manager.flush().await;
        let comment = manager.comments(post).unwrap()[0].clone();

        let err = manager
            .edit_comment(post, comment.id, "defaced", stranger)
            .unwrap_err();
        assert!(matches!(err, InteractionError::Unauthorized));
        assert_eq!(manager.comments(post).unwrap()[0].content, "my caption");

        let err = manager.delete_comment(post, comment.id, stranger).unwrap_err();
        assert!(matches!(err, InteractionError::Unauthorized));
        assert_eq!(manager.comments(post).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn temporary_comment_id_is_replaced_by_remote_id() {
        let (manager, _remote) = manager();
        let author = Uuid::new_v4();
        let post = seeded_post(&manager, author);

        let optimistic = manager.add_comment(post, author, "first!").unwrap();
        assert!(optimistic.pending);

        manager.flush().await;
        let persisted = manager.comments(post).unwrap()[0].clone();
        assert!(!persisted.pending);
        assert_ne!(persisted.id, optimistic.id);
        assert_eq!(persisted.content, "first!");
    }

    #[tokio::test]
    async fn edit_queued_behind_pending_create_lands_on_remote_id() {
        let (manager, remote) = manager();
        let author = Uuid::new_v4();
        let post = seeded_post(&manager, author);

        // Current-thread runtime: the pipeline task cannot run until the
        // first await, so the edit queues behind the create.
        let optimistic = manager.add_comment(post, author, "firts!").unwrap();
        manager
            .edit_comment(post, optimistic.id, "first!", author)
            .unwrap();
        manager.flush().await;

        let persisted = manager.comments(post).unwrap()[0].clone();
        assert_eq!(persisted.content, "first!");
        assert!(!persisted.pending);
        assert_eq!(remote.recorded_comments(post), 1);
    }

    #[tokio::test]
    async fn delete_behind_pending_create_never_resurrects_the_comment() {
        let (manager, remote) = manager();
        let author = Uuid::new_v4();
        let post = seeded_post(&manager, author);

        // Would hit whichever call reaches the backend first; none should.
        remote.fail_next(RemoteError::Unavailable("offline".to_string()));

        let optimistic = manager.add_comment(post, author, "second thoughts").unwrap();
        manager.delete_comment(post, optimistic.id, author).unwrap();
        manager.flush().await;

        // The create skipped and the queued delete was purged with it, so
        // the rollback path can never re-insert the phantom comment.
        assert_eq!(manager.comments(post).unwrap().len(), 0);
        assert_eq!(remote.recorded_comments(post), 0);
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn edit_purged_with_its_deleted_pending_comment() {
        let (manager, remote) = manager();
        let author = Uuid::new_v4();
        let post = seeded_post(&manager, author);

        let optimistic = manager.add_comment(post, author, "typo herre").unwrap();
        manager
            .edit_comment(post, optimistic.id, "typo here", author)
            .unwrap();
        manager.delete_comment(post, optimistic.id, author).unwrap();
        manager.flush().await;

        assert_eq!(manager.comments(post).unwrap().len(), 0);
        assert_eq!(remote.recorded_comments(post), 0);
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn begin_and_cancel_edit_flip_the_local_flag_only() {
        let (manager, remote) = manager();
        let author = Uuid::new_v4();
        let post = seeded_post(&manager, author);

        manager.add_comment(post, author, "draft me").unwrap();
        manager.flush().await;
        let comment = manager.comments(post).unwrap()[0].clone();
        let calls = remote.call_count();

        let editing = manager.begin_edit(post, comment.id, author).unwrap();
        assert!(editing.is_editing);
        let idle = manager.cancel_edit(post, comment.id, author).unwrap();
        assert!(!idle.is_editing);

        manager.flush().await;
        assert_eq!(remote.call_count(), calls);
    }

    #[tokio::test]
    async fn session_wrappers_resolve_the_current_viewer() {
        let remote = Arc::new(MockSocialService::new());
        let viewer = Viewer::new("ana");
        let manager = InteractionStateManager::with_session(
            remote.clone(),
            Arc::new(StaticSession::new(viewer.clone())),
        );
        let target = Uuid::new_v4();
        assert_eq!(manager.session_viewer().unwrap().id, viewer.id);

        let state = manager.toggle_follow_as_viewer(target).unwrap();
        assert_eq!(state.viewer, viewer.id);
        assert!(state.following);

        manager.flush().await;
        assert!(remote.records_follow(viewer.id, target));
    }

    #[tokio::test]
    async fn anonymous_session_cannot_use_wrappers() {
        let (manager, _remote) = manager();
        let err = manager.toggle_follow_as_viewer(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, InteractionError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn queued_toggles_serialize_and_settle_on_final_state() {
        let (manager, remote) = manager();
        let (viewer, target) = (Uuid::new_v4(), Uuid::new_v4());

        // Three flips before the pipeline task gets to run once.
        manager.toggle_follow(viewer, target).unwrap();
        manager.toggle_follow(viewer, target).unwrap();
        let last = manager.toggle_follow(viewer, target).unwrap();
        assert!(last.following);

        manager.flush().await;
        assert!(manager.is_following(viewer, target));
        assert!(remote.records_follow(viewer, target));
    }

    #[tokio::test]
    async fn failed_create_removes_the_optimistic_comment() {
        let (manager, remote) = manager();
        let author = Uuid::new_v4();
        let post = seeded_post(&manager, author);

        remote.fail_next(RemoteError::Unavailable("offline".to_string()));
        let mut events = manager.subscribe();

        manager.add_comment(post, author, "lost in transit").unwrap();
        assert_eq!(manager.comments(post).unwrap().len(), 1);
        manager.flush().await;

        assert_eq!(manager.comments(post).unwrap().len(), 0);
        assert_eq!(remote.recorded_comments(post), 0);

        let mut failed = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, InteractionEvent::ActionFailed { .. }) {
                failed = true;
            }
        }
        assert!(failed);
    }
}
