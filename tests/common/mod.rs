#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use pollhub::models::comment_models::Comment;
use pollhub::models::poll_models::{Poll, PollOption, Privacy};
use pollhub::models::user_action_models::{
    BookmarkAction, ShareAction, UserAction, VoteAction,
};
use pollhub::repositories::{
    CommentRepository, PollFieldUpdate, PollListFilter, PollRepository, UserActionRepository,
};
use pollhub::services::models::CreatePollInput;
use pollhub::services::{CommentService, PollService, UserActionService};
use pollhub::utils::error::{AppError, AppResult};
use pollhub::utils::profile::{OwnerSummary, ProfileLookup};

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

#[derive(Default)]
struct StoreData {
    polls: HashMap<ObjectId, Poll>,
    actions: HashMap<(ObjectId, i64), UserAction>,
    comments: HashMap<ObjectId, Comment>,
}

/// In-memory stand-in for the document store, honoring the same contracts
/// as the Mongo repositories: paired writes are all-or-nothing, and the
/// (user_id, poll_id) pair is unique. `fail_poll_writes` simulates a store
/// fault on the counter half of a paired write, after the action half has
/// been prepared; a correct implementation must leave no partial state.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
    pub fail_poll_writes: AtomicBool,
}

impl MemoryStore {
    pub fn fail_next_poll_writes(&self, fail: bool) {
        self.fail_poll_writes.store(fail, Ordering::SeqCst);
    }

    fn poll_write_fault(&self) -> AppResult<()> {
        if self.fail_poll_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("simulated store fault".to_string()));
        }
        Ok(())
    }

    pub fn poll(&self, id_hex: &str) -> Poll {
        let id = ObjectId::parse_str(id_hex).expect("valid poll id");
        self.data
            .lock()
            .unwrap()
            .polls
            .get(&id)
            .cloned()
            .expect("poll exists")
    }

    pub fn poll_count(&self) -> usize {
        self.data.lock().unwrap().polls.len()
    }

    pub fn action(&self, poll_hex: &str, user_id: i64) -> Option<UserAction> {
        let poll_id = ObjectId::parse_str(poll_hex).expect("valid poll id");
        self.data
            .lock()
            .unwrap()
            .actions
            .get(&(poll_id, user_id))
            .cloned()
    }

    pub fn action_count(&self) -> usize {
        self.data.lock().unwrap().actions.len()
    }

    pub fn comment_count_for(&self, poll_hex: &str) -> usize {
        let poll_id = ObjectId::parse_str(poll_hex).expect("valid poll id");
        self.data
            .lock()
            .unwrap()
            .comments
            .values()
            .filter(|c| c.poll_id == poll_id)
            .count()
    }

    /// Asserts the central cross-collection invariant: every denormalized
    /// counter on the poll equals the true count of matching records.
    pub fn assert_counters_consistent(&self, poll_hex: &str) {
        let poll_id = ObjectId::parse_str(poll_hex).expect("valid poll id");
        let data = self.data.lock().unwrap();
        let poll = data.polls.get(&poll_id).expect("poll exists");

        let actions: Vec<&UserAction> = data
            .actions
            .values()
            .filter(|a| a.poll_id == poll_id)
            .collect();

        let votes = actions.iter().filter(|a| a.has_voted.is_some()).count() as i64;
        let shares = actions.iter().filter(|a| a.has_shared.is_some()).count() as i64;
        let bookmarks = actions.iter().filter(|a| a.has_bookmarked.is_some()).count() as i64;
        let comments = data
            .comments
            .values()
            .filter(|c| c.poll_id == poll_id)
            .count() as i64;

        assert_eq!(poll.votes_counter, votes, "votes_counter diverged");
        assert_eq!(poll.shares_counter, shares, "shares_counter diverged");
        assert_eq!(poll.bookmarks_counter, bookmarks, "bookmarks_counter diverged");
        assert_eq!(poll.comments_counter, comments, "comments_counter diverged");

        for option in &poll.options {
            let option_votes = actions
                .iter()
                .filter(|a| {
                    a.has_voted
                        .as_ref()
                        .is_some_and(|v| v.vote == option.option_text)
                })
                .count() as i64;
            assert_eq!(
                option.votes, option_votes,
                "option {:?} votes diverged",
                option.option_text
            );
        }
    }
}

#[async_trait]
impl PollRepository for MemoryStore {
    async fn create(&self, poll: Poll) -> AppResult<ObjectId> {
        let id = poll.id;
        self.data.lock().unwrap().polls.insert(id, poll);
        Ok(id)
    }

    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<Poll>> {
        Ok(self.data.lock().unwrap().polls.get(&id).cloned())
    }

    async fn update(
        &self,
        id: ObjectId,
        fields: PollFieldUpdate,
        add_options: Vec<PollOption>,
        del_options: Vec<String>,
    ) -> AppResult<ObjectId> {
        let mut data = self.data.lock().unwrap();
        let poll = data
            .polls
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Poll not found".to_string()))?;

        if let Some(title) = fields.title {
            poll.title = title;
        }
        if let Some(description) = fields.description {
            poll.description = description;
        }
        if let Some(category) = fields.category {
            poll.category = category;
        }
        if let Some(privacy) = fields.privacy {
            poll.privacy = privacy;
        }
        poll.options
            .retain(|option| !del_options.contains(&option.option_text));
        poll.options.extend(add_options);

        Ok(id)
    }

    async fn delete(&self, poll: &Poll) -> AppResult<ObjectId> {
        let mut data = self.data.lock().unwrap();
        data.polls
            .remove(&poll.id)
            .ok_or_else(|| AppError::NotFound("Poll not found".to_string()))?;
        data.comments.retain(|_, c| c.poll_id != poll.id);
        data.actions.retain(|_, a| a.poll_id != poll.id);
        Ok(poll.id)
    }

    async fn add_option(&self, id: ObjectId, option: PollOption) -> AppResult<()> {
        let mut data = self.data.lock().unwrap();
        let poll = data
            .polls
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Poll not found".to_string()))?;
        poll.options.push(option);
        Ok(())
    }

    async fn del_option(&self, id: ObjectId, option_text: &str) -> AppResult<()> {
        let mut data = self.data.lock().unwrap();
        let poll = data
            .polls
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Poll not found".to_string()))?;
        poll.options.retain(|o| o.option_text != option_text);
        Ok(())
    }

    async fn list(&self, filter: PollListFilter) -> AppResult<Vec<Poll>> {
        let data = self.data.lock().unwrap();
        let mut polls: Vec<Poll> = data
            .polls
            .values()
            .filter(|poll| {
                poll.privacy == Privacy::Public || filter.viewer == Some(poll.owner_user_id)
            })
            .filter(|poll| {
                filter
                    .owner
                    .map_or(true, |owner| poll.owner_user_id == owner)
            })
            .filter(|poll| {
                filter.search.as_ref().map_or(true, |needle| {
                    let needle = needle.to_lowercase();
                    poll.title.to_lowercase().contains(&needle)
                        || poll.description.to_lowercase().contains(&needle)
                        || poll.category.to_lowercase().contains(&needle)
                })
            })
            .cloned()
            .collect();
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(polls)
    }
}

#[async_trait]
impl UserActionRepository for MemoryStore {
    async fn find(&self, poll_id: ObjectId, user_id: i64) -> AppResult<Option<UserAction>> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .actions
            .get(&(poll_id, user_id))
            .cloned())
    }

    async fn create(&self, poll_id: ObjectId, user_id: i64) -> AppResult<ObjectId> {
        let mut data = self.data.lock().unwrap();
        if data.actions.contains_key(&(poll_id, user_id)) {
            return Err(AppError::validation(
                "user_action",
                "An action record already exists for this user and poll",
            ));
        }
        let shell = UserAction::shell(poll_id, user_id);
        let id = shell.id;
        data.actions.insert((poll_id, user_id), shell);
        Ok(id)
    }

    async fn insert_vote(
        &self,
        poll_id: ObjectId,
        user_id: i64,
        vote: &str,
    ) -> AppResult<ObjectId> {
        let mut data = self.data.lock().unwrap();

        let mut action = data
            .actions
            .get(&(poll_id, user_id))
            .cloned()
            .unwrap_or_else(|| UserAction::shell(poll_id, user_id));
        action.has_voted = Some(VoteAction {
            vote: vote.to_string(),
            voted_at: Utc::now(),
        });

        let mut poll = data
            .polls
            .get(&poll_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Poll not found".to_string()))?;

        // Counter half of the paired write; nothing committed yet, so a
        // fault here rolls the action half back too.
        self.poll_write_fault()?;

        if !poll.voters.contains(&user_id) {
            poll.voters.push(user_id);
        }
        poll.votes_counter += 1;
        if let Some(option) = poll.options.iter_mut().find(|o| o.option_text == vote) {
            option.votes += 1;
        }

        let id = action.id;
        data.actions.insert((poll_id, user_id), action);
        data.polls.insert(poll_id, poll);
        Ok(id)
    }

    async fn update_vote(
        &self,
        poll_id: ObjectId,
        user_id: i64,
        new_vote: &str,
        old_vote: &str,
    ) -> AppResult<ObjectId> {
        let mut data = self.data.lock().unwrap();

        let mut action = data
            .actions
            .get(&(poll_id, user_id))
            .cloned()
            .ok_or_else(|| AppError::NotFound("User action not found".to_string()))?;
        let Some(voted) = action.has_voted.as_mut() else {
            return Err(AppError::NotFound("User action not found".to_string()));
        };
        voted.vote = new_vote.to_string();

        let mut poll = data
            .polls
            .get(&poll_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Poll not found".to_string()))?;

        self.poll_write_fault()?;

        if let Some(option) = poll.options.iter_mut().find(|o| o.option_text == old_vote) {
            option.votes -= 1;
        }
        if let Some(option) = poll.options.iter_mut().find(|o| o.option_text == new_vote) {
            option.votes += 1;
        }

        let id = action.id;
        data.actions.insert((poll_id, user_id), action);
        data.polls.insert(poll_id, poll);
        Ok(id)
    }

    async fn delete_vote(
        &self,
        poll_id: ObjectId,
        user_id: i64,
        old_vote: &str,
    ) -> AppResult<ObjectId> {
        let mut data = self.data.lock().unwrap();

        let mut action = data
            .actions
            .get(&(poll_id, user_id))
            .cloned()
            .ok_or_else(|| AppError::NotFound("User action not found".to_string()))?;
        action.has_voted = None;

        let mut poll = data
            .polls
            .get(&poll_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Poll not found".to_string()))?;

        self.poll_write_fault()?;

        poll.voters.retain(|voter| *voter != user_id);
        poll.votes_counter -= 1;
        if let Some(option) = poll.options.iter_mut().find(|o| o.option_text == old_vote) {
            option.votes -= 1;
        }

        let id = action.id;
        data.actions.insert((poll_id, user_id), action);
        data.polls.insert(poll_id, poll);
        Ok(id)
    }

    async fn set_shared(&self, poll_id: ObjectId, user_id: i64) -> AppResult<ObjectId> {
        self.set_action_field(poll_id, user_id, ActionField::Share, true)
    }

    async fn unset_shared(&self, poll_id: ObjectId, user_id: i64) -> AppResult<ObjectId> {
        self.set_action_field(poll_id, user_id, ActionField::Share, false)
    }

    async fn set_bookmarked(&self, poll_id: ObjectId, user_id: i64) -> AppResult<ObjectId> {
        self.set_action_field(poll_id, user_id, ActionField::Bookmark, true)
    }

    async fn unset_bookmarked(&self, poll_id: ObjectId, user_id: i64) -> AppResult<ObjectId> {
        self.set_action_field(poll_id, user_id, ActionField::Bookmark, false)
    }
}

enum ActionField {
    Share,
    Bookmark,
}

impl MemoryStore {
    fn set_action_field(
        &self,
        poll_id: ObjectId,
        user_id: i64,
        field: ActionField,
        present: bool,
    ) -> AppResult<ObjectId> {
        let mut data = self.data.lock().unwrap();

        let existing = data.actions.get(&(poll_id, user_id)).cloned();
        if !present && existing.is_none() {
            return Err(AppError::NotFound("User action not found".to_string()));
        }
        let mut action = existing.unwrap_or_else(|| UserAction::shell(poll_id, user_id));
        match field {
            ActionField::Share => {
                action.has_shared = present.then(|| ShareAction {
                    shared_at: Utc::now(),
                });
            }
            ActionField::Bookmark => {
                action.has_bookmarked = present.then(|| BookmarkAction {
                    bookmarked_at: Utc::now(),
                });
            }
        }

        let mut poll = data
            .polls
            .get(&poll_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Poll not found".to_string()))?;

        self.poll_write_fault()?;

        let delta = if present { 1 } else { -1 };
        match field {
            ActionField::Share => poll.shares_counter += delta,
            ActionField::Bookmark => poll.bookmarks_counter += delta,
        }

        let id = action.id;
        data.actions.insert((poll_id, user_id), action);
        data.polls.insert(poll_id, poll);
        Ok(id)
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create(&self, comment: Comment) -> AppResult<ObjectId> {
        let mut data = self.data.lock().unwrap();
        let mut poll = data
            .polls
            .get(&comment.poll_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Poll not found".to_string()))?;

        self.poll_write_fault()?;

        poll.comments_counter += 1;
        let id = comment.id;
        let poll_id = comment.poll_id;
        data.comments.insert(id, comment);
        data.polls.insert(poll_id, poll);
        Ok(id)
    }

    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<Comment>> {
        Ok(self.data.lock().unwrap().comments.get(&id).cloned())
    }

    async fn update(&self, id: ObjectId, text: &str) -> AppResult<ObjectId> {
        let mut data = self.data.lock().unwrap();
        let comment = data
            .comments
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
        comment.comment = text.to_string();
        Ok(id)
    }

    async fn delete(&self, id: ObjectId, poll_id: ObjectId) -> AppResult<ObjectId> {
        let mut data = self.data.lock().unwrap();
        data.comments
            .remove(&id)
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
        if let Some(poll) = data.polls.get_mut(&poll_id) {
            poll.comments_counter -= 1;
        }
        Ok(id)
    }

    async fn list_for_poll(&self, poll_id: ObjectId) -> AppResult<Vec<Comment>> {
        let data = self.data.lock().unwrap();
        let mut comments: Vec<Comment> = data
            .comments
            .values()
            .filter(|c| c.poll_id == poll_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }
}

pub struct StaticProfiles;

#[async_trait]
impl ProfileLookup for StaticProfiles {
    async fn get_owner_summary(&self, user_id: i64) -> AppResult<OwnerSummary> {
        Ok(OwnerSummary {
            username: format!("user{}", user_id),
            display_name: format!("User {}", user_id),
            profile_picture: None,
        })
    }
}

pub struct FailingProfiles;

#[async_trait]
impl ProfileLookup for FailingProfiles {
    async fn get_owner_summary(&self, _user_id: i64) -> AppResult<OwnerSummary> {
        Err(AppError::Database(
            "profile service unavailable".to_string(),
        ))
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub polls: PollService,
    pub user_actions: UserActionService,
    pub comments: CommentService,
}

pub fn test_app() -> TestApp {
    test_app_with_profiles(Arc::new(StaticProfiles))
}

pub fn test_app_with_profiles(profiles: Arc<dyn ProfileLookup>) -> TestApp {
    init_tracing();
    let store = Arc::new(MemoryStore::default());
    TestApp {
        store: store.clone(),
        polls: PollService::new(store.clone(), store.clone(), profiles.clone()),
        user_actions: UserActionService::new(store.clone(), store.clone()),
        comments: CommentService::new(store.clone(), store.clone(), profiles),
    }
}

/// Creates a poll through the service and returns its external id.
pub async fn create_poll(
    app: &TestApp,
    owner: i64,
    privacy: Privacy,
    options: &[&str],
) -> String {
    let view = app
        .polls
        .create(
            CreatePollInput {
                title: "Favorite color?".to_string(),
                description: "Pick one".to_string(),
                category: "general".to_string(),
                privacy,
                options: options.iter().map(|s| (*s).to_string()).collect(),
            },
            owner,
        )
        .await
        .expect("poll creation succeeds");
    view.id
}
