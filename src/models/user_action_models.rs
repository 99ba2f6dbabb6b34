use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Per-(user, poll) action record, created lazily on the first interaction.
/// The three sub-records are independently present; a user can vote, share
/// and bookmark the same poll through one document. Uniqueness of
/// (user_id, poll_id) is enforced by an index at the storage layer.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserAction {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: i64,

    pub poll_id: ObjectId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_voted: Option<VoteAction>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_shared: Option<ShareAction>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_bookmarked: Option<BookmarkAction>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VoteAction {
    /// The option_text of the chosen option.
    pub vote: String,
    pub voted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ShareAction {
    pub shared_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BookmarkAction {
    pub bookmarked_at: DateTime<Utc>,
}

impl UserAction {
    /// Empty shell for a (user, poll) pair with no action recorded yet.
    pub fn shell(poll_id: ObjectId, user_id: i64) -> Self {
        Self {
            id: ObjectId::new(),
            user_id,
            poll_id,
            has_voted: None,
            has_shared: None,
            has_bookmarked: None,
        }
    }
}
