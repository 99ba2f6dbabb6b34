use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::poll_models::{Poll, PollOption, Privacy};
use crate::models::user_action_models::{BookmarkAction, ShareAction, UserAction, VoteAction};
use crate::utils::error::{AppError, AppResult};
use crate::utils::profile::OwnerSummary;

pub const TITLE_MAX: usize = 150;
pub const DESCRIPTION_MAX: usize = 2000;
pub const CATEGORY_MAX: usize = 50;
pub const OPTION_TEXT_MAX: usize = 100;
pub const COMMENT_MAX: usize = 500;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 18;

#[derive(Debug, Deserialize)]
pub struct CreatePollInput {
    pub title: String,
    pub description: String,
    pub category: String,
    pub privacy: Privacy,
    pub options: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePollInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub privacy: Option<Privacy>,
    #[serde(default)]
    pub add_options: Vec<String>,
    #[serde(default)]
    pub del_options: Vec<String>,
}

/// Projection of a caller's own action record, attached to poll reads.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct UserActionView {
    pub has_voted: Option<VoteAction>,
    pub has_shared: Option<ShareAction>,
    pub has_bookmarked: Option<BookmarkAction>,
}

impl From<UserAction> for UserActionView {
    fn from(action: UserAction) -> Self {
        Self {
            has_voted: action.has_voted,
            has_shared: action.has_shared,
            has_bookmarked: action.has_bookmarked,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PollView {
    pub id: String,
    pub owner_user_id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub privacy: Privacy,
    pub created_at: DateTime<Utc>,
    pub options: Vec<PollOption>,
    pub voters: Vec<i64>,
    pub votes_counter: i64,
    pub shares_counter: i64,
    pub bookmarks_counter: i64,
    pub comments_counter: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_action: Option<UserActionView>,
}

impl PollView {
    pub fn from_poll(poll: Poll) -> Self {
        Self {
            id: poll.id.to_hex(),
            owner_user_id: poll.owner_user_id,
            title: poll.title,
            description: poll.description,
            category: poll.category,
            privacy: poll.privacy,
            created_at: poll.created_at,
            options: poll.options,
            voters: poll.voters,
            votes_counter: poll.votes_counter,
            shares_counter: poll.shares_counter,
            bookmarks_counter: poll.bookmarks_counter,
            comments_counter: poll.comments_counter,
            owner: None,
            viewer_action: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: String,
    pub poll_id: String,
    pub user_id: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<OwnerSummary>,
}

/// Rejects empty-after-trim and over-length values; returns the trimmed text.
pub(crate) fn validate_text(field: &str, value: &str, max: usize) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(field, "must not be empty"));
    }
    if trimmed.chars().count() > max {
        return Err(AppError::validation(
            field,
            format!("must be at most {} characters", max),
        ));
    }
    Ok(trimmed.to_string())
}
