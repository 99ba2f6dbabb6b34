use std::sync::Arc;

use mongodb::bson::oid::ObjectId;

use super::{ensure_visible, parse_object_id};
use crate::models::user_action_models::UserAction;
use crate::repositories::{PollRepository, UserActionRepository};
use crate::utils::error::{AppError, AppResult};

/// Vote / share / bookmark orchestration. Enforces the one-action-per-user
/// invariants up front; the paired counter writes happen transactionally in
/// the repository.
#[derive(Clone)]
pub struct UserActionService {
    polls: Arc<dyn PollRepository>,
    actions: Arc<dyn UserActionRepository>,
}

impl UserActionService {
    pub fn new(polls: Arc<dyn PollRepository>, actions: Arc<dyn UserActionRepository>) -> Self {
        Self { polls, actions }
    }

    async fn find_action(
        &self,
        poll_id: ObjectId,
        user_id: i64,
    ) -> AppResult<Option<UserAction>> {
        self.actions.find(poll_id, user_id).await
    }

    pub async fn vote_add(&self, id: &str, user_id: i64, vote: &str) -> AppResult<String> {
        let poll_id = parse_object_id("id", id)?;
        let poll = self.polls.require_by_id(poll_id).await?;
        ensure_visible(&poll, Some(user_id))?;

        if !poll.has_option(vote) {
            return Err(AppError::validation(
                "vote",
                "This option does not exist for this poll",
            ));
        }

        match self.find_action(poll_id, user_id).await? {
            Some(action) if action.has_voted.is_some() => {
                return Err(AppError::validation(
                    "vote",
                    "You have already voted for this poll",
                ));
            }
            Some(_) => {}
            None => {
                // Lazily create the action shell. The unique index on
                // (user_id, poll_id) turns a concurrent double-create into a
                // storage-level failure instead of a duplicate record.
                self.actions.create(poll_id, user_id).await?;
            }
        }

        let action_id = self.actions.insert_vote(poll_id, user_id, vote).await?;
        Ok(action_id.to_hex())
    }

    pub async fn vote_update(&self, id: &str, user_id: i64, new_vote: &str) -> AppResult<String> {
        let poll_id = parse_object_id("id", id)?;
        let poll = self.polls.require_by_id(poll_id).await?;

        if !poll.has_option(new_vote) {
            return Err(AppError::validation(
                "vote",
                "This option does not exist for this poll",
            ));
        }

        let existing = self
            .find_action(poll_id, user_id)
            .await?
            .and_then(|action| action.has_voted);
        let Some(previous) = existing else {
            return Err(AppError::validation(
                "vote",
                "You have not voted for this poll",
            ));
        };

        if previous.vote == new_vote {
            return Err(AppError::validation(
                "vote",
                "You already voted for this option",
            ));
        }

        let action_id = self
            .actions
            .update_vote(poll_id, user_id, new_vote, &previous.vote)
            .await?;
        Ok(action_id.to_hex())
    }

    pub async fn vote_delete(&self, id: &str, user_id: i64) -> AppResult<String> {
        let poll_id = parse_object_id("id", id)?;
        self.polls.require_by_id(poll_id).await?;

        let existing = self
            .find_action(poll_id, user_id)
            .await?
            .and_then(|action| action.has_voted);
        let Some(previous) = existing else {
            return Err(AppError::validation(
                "vote",
                "You have not voted for this poll",
            ));
        };

        let action_id = self
            .actions
            .delete_vote(poll_id, user_id, &previous.vote)
            .await?;
        Ok(action_id.to_hex())
    }

    pub async fn share_add(&self, id: &str, user_id: i64) -> AppResult<String> {
        let poll_id = parse_object_id("id", id)?;
        let poll = self.polls.require_by_id(poll_id).await?;
        ensure_visible(&poll, Some(user_id))?;

        match self.find_action(poll_id, user_id).await? {
            Some(action) if action.has_shared.is_some() => {
                return Err(AppError::validation(
                    "share",
                    "You have already shared this poll",
                ));
            }
            Some(_) => {}
            None => {
                self.actions.create(poll_id, user_id).await?;
            }
        }

        let action_id = self.actions.set_shared(poll_id, user_id).await?;
        Ok(action_id.to_hex())
    }

    pub async fn share_remove(&self, id: &str, user_id: i64) -> AppResult<String> {
        let poll_id = parse_object_id("id", id)?;
        self.polls.require_by_id(poll_id).await?;

        let shared = self
            .find_action(poll_id, user_id)
            .await?
            .is_some_and(|action| action.has_shared.is_some());
        if !shared {
            return Err(AppError::validation(
                "share",
                "You have not shared this poll",
            ));
        }

        let action_id = self.actions.unset_shared(poll_id, user_id).await?;
        Ok(action_id.to_hex())
    }

    pub async fn bookmark_add(&self, id: &str, user_id: i64) -> AppResult<String> {
        let poll_id = parse_object_id("id", id)?;
        let poll = self.polls.require_by_id(poll_id).await?;
        ensure_visible(&poll, Some(user_id))?;

        match self.find_action(poll_id, user_id).await? {
            Some(action) if action.has_bookmarked.is_some() => {
                return Err(AppError::validation(
                    "bookmark",
                    "You have already bookmarked this poll",
                ));
            }
            Some(_) => {}
            None => {
                self.actions.create(poll_id, user_id).await?;
            }
        }

        let action_id = self.actions.set_bookmarked(poll_id, user_id).await?;
        Ok(action_id.to_hex())
    }

    pub async fn bookmark_remove(&self, id: &str, user_id: i64) -> AppResult<String> {
        let poll_id = parse_object_id("id", id)?;
        self.polls.require_by_id(poll_id).await?;

        let bookmarked = self
            .find_action(poll_id, user_id)
            .await?
            .is_some_and(|action| action.has_bookmarked.is_some());
        if !bookmarked {
            return Err(AppError::validation(
                "bookmark",
                "You have not bookmarked this poll",
            ));
        }

        let action_id = self.actions.unset_bookmarked(poll_id, user_id).await?;
        Ok(action_id.to_hex())
    }
}
