use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ReturnDocument;
use mongodb::ClientSession;

use super::{finish_transaction, with_deadline, UserActionRepository};
use crate::db::PollStore;
use crate::models::user_action_models::{BookmarkAction, ShareAction, UserAction, VoteAction};
use crate::utils::error::{AppError, AppResult};

/// Per-(user, poll) action records and the paired counter updates on the
/// poll document. Every method that touches both documents runs as one
/// transaction: both writes land or neither does.
#[derive(Clone)]
pub struct MongoUserActionRepository {
    store: PollStore,
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}

impl MongoUserActionRepository {
    pub fn new(store: PollStore) -> Self {
        Self { store }
    }

    /// Upserts/updates the action document and applies the paired poll
    /// update, inside the caller's transaction. Returns the action id.
    async fn paired_write_in_txn(
        &self,
        session: &mut ClientSession,
        poll_id: ObjectId,
        user_id: i64,
        action_update: Document,
        upsert: bool,
        poll_update: Document,
        array_filters: Option<Vec<Document>>,
    ) -> AppResult<ObjectId> {
        let action = self
            .store
            .user_actions()
            .find_one_and_update(doc! { "user_id": user_id, "poll_id": poll_id }, action_update)
            .upsert(upsert)
            .return_document(ReturnDocument::After)
            .session(&mut *session)
            .await?
            .ok_or_else(|| AppError::NotFound("User action not found".to_string()))?;

        let polls = self.store.polls();
        let mut poll_write = polls.update_one(doc! { "_id": poll_id }, poll_update);
        if let Some(filters) = array_filters {
            poll_write = poll_write.array_filters(filters);
        }
        let result = poll_write.session(&mut *session).await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound("Poll not found".to_string()));
        }

        Ok(action.id)
    }

    async fn run_paired_write(
        &self,
        poll_id: ObjectId,
        user_id: i64,
        action_update: Document,
        upsert: bool,
        poll_update: Document,
        array_filters: Option<Vec<Document>>,
    ) -> AppResult<ObjectId> {
        let mut session = self.store.start_session().await?;
        session.start_transaction().await?;
        let outcome = with_deadline(
            self.store.txn_deadline(),
            self.paired_write_in_txn(
                &mut session,
                poll_id,
                user_id,
                action_update,
                upsert,
                poll_update,
                array_filters,
            ),
        )
        .await;
        finish_transaction(session, outcome).await
    }
}

#[async_trait]
impl UserActionRepository for MongoUserActionRepository {
    async fn find(&self, poll_id: ObjectId, user_id: i64) -> AppResult<Option<UserAction>> {
        Ok(self
            .store
            .user_actions()
            .find_one(doc! { "user_id": user_id, "poll_id": poll_id })
            .await?)
    }

    async fn create(&self, poll_id: ObjectId, user_id: i64) -> AppResult<ObjectId> {
        let shell = UserAction::shell(poll_id, user_id);
        let id = shell.id;
        self.store
            .user_actions()
            .insert_one(&shell)
            .await
            .map_err(|err| {
                if is_duplicate_key(&err) {
                    AppError::validation(
                        "user_action",
                        "An action record already exists for this user and poll",
                    )
                } else {
                    err.into()
                }
            })?;
        Ok(id)
    }

    async fn insert_vote(
        &self,
        poll_id: ObjectId,
        user_id: i64,
        vote: &str,
    ) -> AppResult<ObjectId> {
        let voted = bson::to_bson(&VoteAction {
            vote: vote.to_string(),
            voted_at: Utc::now(),
        })?;

        self.run_paired_write(
            poll_id,
            user_id,
            doc! { "$set": { "has_voted": voted } },
            true,
            doc! {
                "$addToSet": { "voters": user_id },
                "$inc": { "votes_counter": 1, "options.$[opt].votes": 1 },
            },
            Some(vec![doc! { "opt.option_text": vote }]),
        )
        .await
    }

    async fn update_vote(
        &self,
        poll_id: ObjectId,
        user_id: i64,
        new_vote: &str,
        old_vote: &str,
    ) -> AppResult<ObjectId> {
        self.run_paired_write(
            poll_id,
            user_id,
            doc! { "$set": { "has_voted.vote": new_vote } },
            false,
            doc! {
                "$inc": {
                    "options.$[oldopt].votes": -1,
                    "options.$[newopt].votes": 1,
                },
            },
            Some(vec![
                doc! { "oldopt.option_text": old_vote },
                doc! { "newopt.option_text": new_vote },
            ]),
        )
        .await
    }

    async fn delete_vote(
        &self,
        poll_id: ObjectId,
        user_id: i64,
        old_vote: &str,
    ) -> AppResult<ObjectId> {
        self.run_paired_write(
            poll_id,
            user_id,
            doc! { "$unset": { "has_voted": "" } },
            false,
            doc! {
                "$pull": { "voters": user_id },
                "$inc": { "votes_counter": -1, "options.$[opt].votes": -1 },
            },
            Some(vec![doc! { "opt.option_text": old_vote }]),
        )
        .await
    }

    async fn set_shared(&self, poll_id: ObjectId, user_id: i64) -> AppResult<ObjectId> {
        let shared = bson::to_bson(&ShareAction {
            shared_at: Utc::now(),
        })?;
        self.run_paired_write(
            poll_id,
            user_id,
            doc! { "$set": { "has_shared": shared } },
            true,
            doc! { "$inc": { "shares_counter": 1 } },
            None,
        )
        .await
    }

    async fn unset_shared(&self, poll_id: ObjectId, user_id: i64) -> AppResult<ObjectId> {
        self.run_paired_write(
            poll_id,
            user_id,
            doc! { "$unset": { "has_shared": "" } },
            false,
            doc! { "$inc": { "shares_counter": -1 } },
            None,
        )
        .await
    }

    async fn set_bookmarked(&self, poll_id: ObjectId, user_id: i64) -> AppResult<ObjectId> {
        let bookmarked = bson::to_bson(&BookmarkAction {
            bookmarked_at: Utc::now(),
        })?;
        self.run_paired_write(
            poll_id,
            user_id,
            doc! { "$set": { "has_bookmarked": bookmarked } },
            true,
            doc! { "$inc": { "bookmarks_counter": 1 } },
            None,
        )
        .await
    }

    async fn unset_bookmarked(&self, poll_id: ObjectId, user_id: i64) -> AppResult<ObjectId> {
        self.run_paired_write(
            poll_id,
            user_id,
            doc! { "$unset": { "has_bookmarked": "" } },
            false,
            doc! { "$inc": { "bookmarks_counter": -1 } },
            None,
        )
        .await
    }
}
