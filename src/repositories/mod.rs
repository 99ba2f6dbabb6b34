pub mod comment_repository;
pub mod filters;
pub mod poll_repository;
pub mod user_action_repository;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use mongodb::ClientSession;

use crate::models::comment_models::Comment;
use crate::models::poll_models::{Poll, PollOption, Privacy};
use crate::models::user_action_models::UserAction;
use crate::utils::error::{AppError, AppResult};

pub use comment_repository::MongoCommentRepository;
pub use poll_repository::MongoPollRepository;
pub use user_action_repository::MongoUserActionRepository;

/// Field-set half of a poll update. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct PollFieldUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub privacy: Option<Privacy>,
}

impl PollFieldUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.privacy.is_none()
    }
}

/// Parameters for list queries. Visibility is always enforced at the store
/// through the predicate built in [`filters`]; `owner` and `search` narrow
/// the result further.
#[derive(Debug, Clone, Default)]
pub struct PollListFilter {
    pub viewer: Option<i64>,
    pub owner: Option<i64>,
    pub search: Option<String>,
}

#[async_trait]
pub trait PollRepository: Send + Sync {
    async fn create(&self, poll: Poll) -> AppResult<ObjectId>;

    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<Poll>>;

    async fn require_by_id(&self, id: ObjectId) -> AppResult<Poll> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Poll not found".to_string()))
    }

    /// Applies the field update, appends `add_options` and removes
    /// `del_options` atomically. Duplicate option_text prevention is the
    /// caller's responsibility.
    async fn update(
        &self,
        id: ObjectId,
        fields: PollFieldUpdate,
        add_options: Vec<PollOption>,
        del_options: Vec<String>,
    ) -> AppResult<ObjectId>;

    /// Deletes the poll together with its comments and user-action records.
    async fn delete(&self, poll: &Poll) -> AppResult<ObjectId>;

    /// Single-document atomic push; no transaction needed.
    async fn add_option(&self, id: ObjectId, option: PollOption) -> AppResult<()>;

    /// Single-document atomic pull; no transaction needed.
    async fn del_option(&self, id: ObjectId, option_text: &str) -> AppResult<()>;

    async fn list(&self, filter: PollListFilter) -> AppResult<Vec<Poll>>;
}

#[async_trait]
pub trait UserActionRepository: Send + Sync {
    async fn find(&self, poll_id: ObjectId, user_id: i64) -> AppResult<Option<UserAction>>;

    /// Inserts an empty action shell for the (user, poll) pair. The unique
    /// index on (user_id, poll_id) makes a concurrent double-insert fail.
    async fn create(&self, poll_id: ObjectId, user_id: i64) -> AppResult<ObjectId>;

    async fn insert_vote(&self, poll_id: ObjectId, user_id: i64, vote: &str)
        -> AppResult<ObjectId>;

    async fn update_vote(
        &self,
        poll_id: ObjectId,
        user_id: i64,
        new_vote: &str,
        old_vote: &str,
    ) -> AppResult<ObjectId>;

    async fn delete_vote(
        &self,
        poll_id: ObjectId,
        user_id: i64,
        old_vote: &str,
    ) -> AppResult<ObjectId>;

    async fn set_shared(&self, poll_id: ObjectId, user_id: i64) -> AppResult<ObjectId>;

    async fn unset_shared(&self, poll_id: ObjectId, user_id: i64) -> AppResult<ObjectId>;

    async fn set_bookmarked(&self, poll_id: ObjectId, user_id: i64) -> AppResult<ObjectId>;

    async fn unset_bookmarked(&self, poll_id: ObjectId, user_id: i64) -> AppResult<ObjectId>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: Comment) -> AppResult<ObjectId>;

    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<Comment>>;

    async fn require_by_id(&self, id: ObjectId) -> AppResult<Comment> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    /// Single-document text update; the comment counter is unaffected.
    async fn update(&self, id: ObjectId, text: &str) -> AppResult<ObjectId>;

    async fn delete(&self, id: ObjectId, poll_id: ObjectId) -> AppResult<ObjectId>;

    async fn list_for_poll(&self, poll_id: ObjectId) -> AppResult<Vec<Comment>>;
}

/// Bounds a transaction body. An elapsed deadline is a storage error, which
/// sends the caller down the abort path.
pub(crate) async fn with_deadline<T, F>(deadline: Duration, body: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(deadline, body).await {
        Ok(outcome) => outcome,
        Err(_) => Err(AppError::Database(format!(
            "transaction exceeded the {}s deadline",
            deadline.as_secs()
        ))),
    }
}

/// Commits on success, aborts on failure. The session itself is released
/// when it drops, on every path.
pub(crate) async fn finish_transaction<T>(
    mut session: ClientSession,
    outcome: AppResult<T>,
) -> AppResult<T> {
    match outcome {
        Ok(value) => {
            session.commit_transaction().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(abort_err) = session.abort_transaction().await {
                tracing::warn!(error = %abort_err, "failed to abort transaction");
            }
            Err(err)
        }
    }
}
