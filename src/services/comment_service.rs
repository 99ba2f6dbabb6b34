use std::sync::Arc;

use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use super::models::{validate_text, CommentView, COMMENT_MAX};
use super::{ensure_visible, parse_object_id};
use crate::models::comment_models::Comment;
use crate::repositories::{CommentRepository, PollRepository};
use crate::utils::error::{AppError, AppResult};
use crate::utils::pagination::{paginate, Page};
use crate::utils::profile::{OwnerSummary, ProfileLookup};

/// Comment orchestration: visibility-gated creation, author-only edits,
/// author-or-poll-owner deletion. Counter maintenance happens in the
/// repository transaction.
#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    polls: Arc<dyn PollRepository>,
    profiles: Arc<dyn ProfileLookup>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        polls: Arc<dyn PollRepository>,
        profiles: Arc<dyn ProfileLookup>,
    ) -> Self {
        Self {
            comments,
            polls,
            profiles,
        }
    }

    async fn author_summary(&self, user_id: i64) -> Option<OwnerSummary> {
        match self.profiles.get_owner_summary(user_id).await {
            Ok(summary) => Some(summary),
            Err(err) => {
                tracing::warn!(user_id, error = %err, "author profile lookup failed");
                None
            }
        }
    }

    pub async fn add(&self, poll_id: &str, user_id: i64, text: &str) -> AppResult<CommentView> {
        let poll_id = parse_object_id("poll_id", poll_id)?;
        let poll = self.polls.require_by_id(poll_id).await?;
        ensure_visible(&poll, Some(user_id))?;

        let text = validate_text("comment", text, COMMENT_MAX)?;

        let comment = Comment {
            id: ObjectId::new(),
            poll_id,
            user_id,
            comment: text,
            created_at: Utc::now(),
        };
        self.comments.create(comment.clone()).await?;

        Ok(CommentView {
            id: comment.id.to_hex(),
            poll_id: comment.poll_id.to_hex(),
            user_id: comment.user_id,
            comment: comment.comment,
            created_at: comment.created_at,
            author: self.author_summary(user_id).await,
        })
    }

    pub async fn update(&self, comment_id: &str, user_id: i64, text: &str) -> AppResult<String> {
        let comment_id = parse_object_id("comment_id", comment_id)?;
        let comment = self.comments.require_by_id(comment_id).await?;
        if comment.user_id != user_id {
            return Err(AppError::PermissionDenied(
                "Only the comment author can edit this comment".to_string(),
            ));
        }

        let text = validate_text("comment", text, COMMENT_MAX)?;
        let updated = self.comments.update(comment_id, &text).await?;
        Ok(updated.to_hex())
    }

    /// The author may always remove their comment; the poll owner may
    /// moderate any comment on their poll.
    pub async fn delete(&self, comment_id: &str, user_id: i64) -> AppResult<String> {
        let comment_id = parse_object_id("comment_id", comment_id)?;
        let comment = self.comments.require_by_id(comment_id).await?;

        let poll_owner = self
            .polls
            .find_by_id(comment.poll_id)
            .await?
            .map(|poll| poll.owner_user_id);

        if comment.user_id != user_id && poll_owner != Some(user_id) {
            return Err(AppError::PermissionDenied(
                "Only the comment author or the poll owner can delete this comment".to_string(),
            ));
        }

        let deleted = self.comments.delete(comment_id, comment.poll_id).await?;
        Ok(deleted.to_hex())
    }

    pub async fn list_for_poll(
        &self,
        poll_id: &str,
        viewer: Option<i64>,
        page: usize,
        page_size: usize,
    ) -> AppResult<Page<CommentView>> {
        let poll_id = parse_object_id("poll_id", poll_id)?;
        let poll = self.polls.require_by_id(poll_id).await?;
        ensure_visible(&poll, viewer)?;

        let comments = self.comments.list_for_poll(poll_id).await?;

        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            let author = self.author_summary(comment.user_id).await;
            views.push(CommentView {
                id: comment.id.to_hex(),
                poll_id: comment.poll_id.to_hex(),
                user_id: comment.user_id,
                comment: comment.comment,
                created_at: comment.created_at,
                author,
            });
        }

        Ok(paginate(views, page, page_size))
    }
}
