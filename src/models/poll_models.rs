use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Poll visibility. Private polls are readable and interactive only for the
/// owner.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    Private,
}

impl Privacy {
    pub fn as_str(self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Private => "private",
        }
    }
}

/// The poll aggregate. Counters are denormalized: each must equal the count
/// of matching `UserAction` / `Comment` documents referencing this poll.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Poll {
    #[serde(rename = "_id")]
    pub id: ObjectId,
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
}

/// One selectable choice embedded in a poll. `option_text` is unique within
/// the poll; `votes` mirrors the count of user actions voting for it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PollOption {
    pub owner_user_id: i64,
    pub option_text: String,
    pub votes: i64,
}

impl Poll {
    pub fn option(&self, option_text: &str) -> Option<&PollOption> {
        self.options.iter().find(|o| o.option_text == option_text)
    }

    pub fn has_option(&self, option_text: &str) -> bool {
        self.option(option_text).is_some()
    }

    /// Options authored by the given user (poll owner or a voter who added
    /// their own choice).
    pub fn options_owned_by(&self, user_id: i64) -> usize {
        self.options
            .iter()
            .filter(|o| o.owner_user_id == user_id)
            .count()
    }
}
