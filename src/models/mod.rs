pub mod comment_models;
pub mod poll_models;
pub mod user_action_models;
