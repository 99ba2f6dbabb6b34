use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A comment on a poll. `Poll.comments_counter` mirrors the number of these
/// documents per poll_id.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub poll_id: ObjectId,

    pub user_id: i64,

    pub comment: String,

    pub created_at: DateTime<Utc>,
}
