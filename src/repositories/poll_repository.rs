use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, doc, Document};
use mongodb::ClientSession;

use super::filters::poll_query;
use super::{finish_transaction, with_deadline, PollFieldUpdate, PollListFilter, PollRepository};
use crate::db::PollStore;
use crate::models::poll_models::{Poll, PollOption};
use crate::utils::error::{AppError, AppResult};

/// Poll aggregate CRUD against the `polls` collection. Multi-statement
/// mutations run inside one transaction; single-document option push/pull
/// rides on the store's own document atomicity.
#[derive(Clone)]
pub struct MongoPollRepository {
    store: PollStore,
}

impl MongoPollRepository {
    pub fn new(store: PollStore) -> Self {
        Self { store }
    }

    async fn update_in_txn(
        &self,
        session: &mut ClientSession,
        id: ObjectId,
        fields: PollFieldUpdate,
        add_options: Vec<PollOption>,
        del_options: Vec<String>,
    ) -> AppResult<ObjectId> {
        let polls = self.store.polls();

        if !fields.is_empty() {
            let mut set = Document::new();
            if let Some(title) = fields.title {
                set.insert("title", title);
            }
            if let Some(description) = fields.description {
                set.insert("description", description);
            }
            if let Some(category) = fields.category {
                set.insert("category", category);
            }
            if let Some(privacy) = fields.privacy {
                set.insert("privacy", privacy.as_str());
            }

            let result = polls
                .update_one(doc! { "_id": id }, doc! { "$set": set })
                .session(&mut *session)
                .await?;
            if result.matched_count == 0 {
                return Err(AppError::NotFound("Poll not found".to_string()));
            }
        }

        if !add_options.is_empty() {
            let options = add_options
                .iter()
                .map(bson::to_bson)
                .collect::<Result<Vec<_>, _>>()?;

            let result = polls
                .update_one(
                    doc! { "_id": id },
                    doc! { "$push": { "options": { "$each": options } } },
                )
                .session(&mut *session)
                .await?;
            if result.matched_count == 0 {
                return Err(AppError::NotFound("Poll not found".to_string()));
            }
        }

        if !del_options.is_empty() {
            let result = polls
                .update_one(
                    doc! { "_id": id },
                    doc! { "$pull": { "options": { "option_text": { "$in": del_options } } } },
                )
                .session(&mut *session)
                .await?;
            if result.matched_count == 0 {
                return Err(AppError::NotFound("Poll not found".to_string()));
            }
        }

        Ok(id)
    }

    async fn delete_in_txn(
        &self,
        session: &mut ClientSession,
        poll: &Poll,
    ) -> AppResult<ObjectId> {
        let result = self
            .store
            .polls()
            .delete_one(doc! { "_id": poll.id })
            .session(&mut *session)
            .await?;
        if result.deleted_count == 0 {
            return Err(AppError::NotFound("Poll not found".to_string()));
        }

        if poll.comments_counter > 0 {
            self.store
                .comments()
                .delete_many(doc! { "poll_id": poll.id })
                .session(&mut *session)
                .await?;
        }

        // Cascade the per-user action records as well, so no orphaned
        // documents survive the poll.
        self.store
            .user_actions()
            .delete_many(doc! { "poll_id": poll.id })
            .session(&mut *session)
            .await?;

        Ok(poll.id)
    }
}

#[async_trait]
impl PollRepository for MongoPollRepository {
    async fn create(&self, poll: Poll) -> AppResult<ObjectId> {
        let id = poll.id;
        self.store.polls().insert_one(&poll).await?;
        Ok(id)
    }

    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<Poll>> {
        Ok(self.store.polls().find_one(doc! { "_id": id }).await?)
    }

    async fn update(
        &self,
        id: ObjectId,
        fields: PollFieldUpdate,
        add_options: Vec<PollOption>,
        del_options: Vec<String>,
    ) -> AppResult<ObjectId> {
        if fields.is_empty() && add_options.is_empty() && del_options.is_empty() {
            return Ok(id);
        }

        let mut session = self.store.start_session().await?;
        session.start_transaction().await?;
        let outcome = with_deadline(
            self.store.txn_deadline(),
            self.update_in_txn(&mut session, id, fields, add_options, del_options),
        )
        .await;
        finish_transaction(session, outcome).await
    }

    async fn delete(&self, poll: &Poll) -> AppResult<ObjectId> {
        let mut session = self.store.start_session().await?;
        session.start_transaction().await?;
        let outcome = with_deadline(
            self.store.txn_deadline(),
            self.delete_in_txn(&mut session, poll),
        )
        .await;
        finish_transaction(session, outcome).await
    }

    async fn add_option(&self, id: ObjectId, option: PollOption) -> AppResult<()> {
        let option = bson::to_bson(&option)?;
        let result = self
            .store
            .polls()
            .update_one(doc! { "_id": id }, doc! { "$push": { "options": option } })
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound("Poll not found".to_string()));
        }
        Ok(())
    }

    async fn del_option(&self, id: ObjectId, option_text: &str) -> AppResult<()> {
        let result = self
            .store
            .polls()
            .update_one(
                doc! { "_id": id },
                doc! { "$pull": { "options": { "option_text": option_text } } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound("Poll not found".to_string()));
        }
        Ok(())
    }

    async fn list(&self, filter: PollListFilter) -> AppResult<Vec<Poll>> {
        let query = poll_query(&filter);
        let cursor = self
            .store
            .polls()
            .find(query)
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
