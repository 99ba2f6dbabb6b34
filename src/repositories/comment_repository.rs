use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::bson::oid::ObjectId;
use mongodb::ClientSession;

use super::{finish_transaction, with_deadline, CommentRepository};
use crate::db::PollStore;
use crate::models::comment_models::Comment;
use crate::utils::error::{AppError, AppResult};

/// Comment CRUD with counter maintenance on the owning poll. Insert and
/// delete pair the comment write with the counter update in one transaction.
#[derive(Clone)]
pub struct MongoCommentRepository {
    store: PollStore,
}

impl MongoCommentRepository {
    pub fn new(store: PollStore) -> Self {
        Self { store }
    }

    async fn create_in_txn(
        &self,
        session: &mut ClientSession,
        comment: &Comment,
    ) -> AppResult<ObjectId> {
        self.store
            .comments()
            .insert_one(comment)
            .session(&mut *session)
            .await?;

        let result = self
            .store
            .polls()
            .update_one(
                doc! { "_id": comment.poll_id },
                doc! { "$inc": { "comments_counter": 1 } },
            )
            .session(&mut *session)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound("Poll not found".to_string()));
        }

        Ok(comment.id)
    }

    async fn delete_in_txn(
        &self,
        session: &mut ClientSession,
        id: ObjectId,
        poll_id: ObjectId,
    ) -> AppResult<ObjectId> {
        let result = self
            .store
            .comments()
            .delete_one(doc! { "_id": id })
            .session(&mut *session)
            .await?;
        if result.deleted_count == 0 {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }

        self.store
            .polls()
            .update_one(
                doc! { "_id": poll_id },
                doc! { "$inc": { "comments_counter": -1 } },
            )
            .session(&mut *session)
            .await?;

        Ok(id)
    }
}

#[async_trait]
impl CommentRepository for MongoCommentRepository {
    async fn create(&self, comment: Comment) -> AppResult<ObjectId> {
        let mut session = self.store.start_session().await?;
        session.start_transaction().await?;
        let outcome = with_deadline(
            self.store.txn_deadline(),
            self.create_in_txn(&mut session, &comment),
        )
        .await;
        finish_transaction(session, outcome).await
    }

    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<Comment>> {
        Ok(self.store.comments().find_one(doc! { "_id": id }).await?)
    }

    async fn update(&self, id: ObjectId, text: &str) -> AppResult<ObjectId> {
        let result = self
            .store
            .comments()
            .update_one(doc! { "_id": id }, doc! { "$set": { "comment": text } })
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }
        Ok(id)
    }

    async fn delete(&self, id: ObjectId, poll_id: ObjectId) -> AppResult<ObjectId> {
        let mut session = self.store.start_session().await?;
        session.start_transaction().await?;
        let outcome = with_deadline(
            self.store.txn_deadline(),
            self.delete_in_txn(&mut session, id, poll_id),
        )
        .await;
        finish_transaction(session, outcome).await
    }

    async fn list_for_poll(&self, poll_id: ObjectId) -> AppResult<Vec<Comment>> {
        let cursor = self
            .store
            .comments()
            .find(doc! { "poll_id": poll_id })
            .sort(doc! { "created_at": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
