use std::sync::Arc;

use crate::db::{PollStore, StoreConfig};
use crate::repositories::{
    MongoCommentRepository, MongoPollRepository, MongoUserActionRepository,
};
use crate::services::{CommentService, PollService, UserActionService};
use crate::utils::error::AppResult;
use crate::utils::profile::ProfileLookup;

/// Composition root. Connects the store (fail-fast), ensures indexes, wires
/// the repositories into the services, and hands the bundle to the caller.
/// The API layer holds one of these per process.
#[derive(Clone)]
pub struct AppContext {
    pub poll_service: PollService,
    pub user_action_service: UserActionService,
    pub comment_service: CommentService,
}

impl AppContext {
    pub async fn init(profiles: Arc<dyn ProfileLookup>) -> AppResult<Self> {
        let config = StoreConfig::from_env()?;
        let store = PollStore::connect(&config).await?;
        store.ensure_indexes().await?;
        Ok(Self::with_store(store, profiles))
    }

    pub fn with_store(store: PollStore, profiles: Arc<dyn ProfileLookup>) -> Self {
        let polls = Arc::new(MongoPollRepository::new(store.clone()));
        let actions = Arc::new(MongoUserActionRepository::new(store.clone()));
        let comments = Arc::new(MongoCommentRepository::new(store));

        Self {
            poll_service: PollService::new(polls.clone(), actions.clone(), profiles.clone()),
            user_action_service: UserActionService::new(polls.clone(), actions),
            comment_service: CommentService::new(comments, polls, profiles),
        }
    }
}
