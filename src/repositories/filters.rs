use mongodb::bson::{doc, Document};

use super::PollListFilter;
use crate::models::poll_models::Privacy;

/// Visibility predicate applied to every poll list query. Anonymous callers
/// see public polls only; authenticated callers additionally see their own
/// private polls.
pub fn visibility_filter(viewer: Option<i64>) -> Document {
    match viewer {
        Some(user_id) => doc! {
            "$or": [
                { "privacy": Privacy::Public.as_str() },
                { "owner_user_id": user_id },
            ]
        },
        None => doc! { "privacy": Privacy::Public.as_str() },
    }
}

/// Full query for a list operation: visibility, optional owner narrowing,
/// optional keyword search against the text index.
pub fn poll_query(filter: &PollListFilter) -> Document {
    let mut query = visibility_filter(filter.viewer);
    if let Some(owner) = filter.owner {
        query.insert("owner_user_id", owner);
    }
    if let Some(search) = &filter.search {
        query.insert("$text", doc! { "$search": search });
    }
    query
}
