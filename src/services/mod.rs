pub mod comment_service;
pub mod models;
pub mod poll_service;
pub mod user_action_service;

use mongodb::bson::oid::ObjectId;

use crate::models::poll_models::{Poll, Privacy};
use crate::utils::error::{AppError, AppResult};

pub use comment_service::CommentService;
pub use poll_service::PollService;
pub use user_action_service::UserActionService;

/// External ids are the store's native object id as a 24-character hex
/// string. Anything else is rejected before any store access.
pub(crate) fn parse_object_id(field: &str, value: &str) -> AppResult<ObjectId> {
    if value.len() != 24 {
        return Err(AppError::validation(
            field,
            "must be a 24 character hex string",
        ));
    }
    ObjectId::parse_str(value).map_err(|_| {
        AppError::validation(field, "must be a 24 character hex string")
    })
}

/// The privacy rule, shared by read and interaction paths: a private poll is
/// visible to its owner only.
pub(crate) fn ensure_visible(poll: &Poll, viewer: Option<i64>) -> AppResult<()> {
    if poll.privacy == Privacy::Private && viewer != Some(poll.owner_user_id) {
        return Err(AppError::PermissionDenied(
            "This poll is private".to_string(),
        ));
    }
    Ok(())
}
