use std::sync::Arc;

use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use super::models::{
    validate_text, CreatePollInput, PollView, UpdatePollInput, UserActionView, CATEGORY_MAX,
    DESCRIPTION_MAX, MAX_OPTIONS, MIN_OPTIONS, OPTION_TEXT_MAX, TITLE_MAX,
};
use super::{ensure_visible, parse_object_id};
use crate::models::poll_models::{Poll, PollOption};
use crate::repositories::{PollFieldUpdate, PollListFilter, PollRepository, UserActionRepository};
use crate::utils::error::{AppError, AppResult};
use crate::utils::pagination::{paginate, Page};
use crate::utils::profile::ProfileLookup;

/// Poll lifecycle orchestration: creation, reads decorated with the owner
/// summary and the caller's own action record, owner-gated updates and
/// deletion, and the option add/remove rules.
#[derive(Clone)]
pub struct PollService {
    polls: Arc<dyn PollRepository>,
    actions: Arc<dyn UserActionRepository>,
    profiles: Arc<dyn ProfileLookup>,
}

impl PollService {
    pub fn new(
        polls: Arc<dyn PollRepository>,
        actions: Arc<dyn UserActionRepository>,
        profiles: Arc<dyn ProfileLookup>,
    ) -> Self {
        Self {
            polls,
            actions,
            profiles,
        }
    }

    pub async fn create(&self, input: CreatePollInput, owner_id: i64) -> AppResult<PollView> {
        let title = validate_text("title", &input.title, TITLE_MAX)?;
        let description = validate_text("description", &input.description, DESCRIPTION_MAX)?;
        let category = validate_text("category", &input.category, CATEGORY_MAX)?;
        let option_texts = normalize_options(&input.options)?;

        let poll = Poll {
            id: ObjectId::new(),
            owner_user_id: owner_id,
            title,
            description,
            category,
            privacy: input.privacy,
            created_at: Utc::now(),
            options: option_texts
                .into_iter()
                .map(|option_text| PollOption {
                    owner_user_id: owner_id,
                    option_text,
                    votes: 0,
                })
                .collect(),
            voters: Vec::new(),
            votes_counter: 0,
            shares_counter: 0,
            bookmarks_counter: 0,
            comments_counter: 0,
        };

        self.polls.create(poll.clone()).await?;
        Ok(PollView::from_poll(poll))
    }

    pub async fn get_by_id(&self, id: &str, viewer: Option<i64>) -> AppResult<PollView> {
        let poll_id = parse_object_id("id", id)?;
        let poll = self.polls.require_by_id(poll_id).await?;
        ensure_visible(&poll, viewer)?;

        let owner_user_id = poll.owner_user_id;
        let mut view = PollView::from_poll(poll);

        // Decoration only: a failing profile lookup must not break the read.
        view.owner = match self.profiles.get_owner_summary(owner_user_id).await {
            Ok(summary) => Some(summary),
            Err(err) => {
                tracing::warn!(user_id = owner_user_id, error = %err, "owner profile lookup failed");
                None
            }
        };

        if let Some(user_id) = viewer {
            view.viewer_action = self
                .actions
                .find(poll_id, user_id)
                .await?
                .map(UserActionView::from);
        }

        Ok(view)
    }

    pub async fn update(
        &self,
        id: &str,
        input: UpdatePollInput,
        user_id: i64,
    ) -> AppResult<String> {
        let poll_id = parse_object_id("id", id)?;
        let poll = self.polls.require_by_id(poll_id).await?;
        if poll.owner_user_id != user_id {
            return Err(AppError::PermissionDenied(
                "Only the poll owner can update this poll".to_string(),
            ));
        }

        let mut fields = PollFieldUpdate::default();
        if let Some(title) = &input.title {
            fields.title = Some(validate_text("title", title, TITLE_MAX)?);
        }
        if let Some(description) = &input.description {
            fields.description = Some(validate_text("description", description, DESCRIPTION_MAX)?);
        }
        if let Some(category) = &input.category {
            fields.category = Some(validate_text("category", category, CATEGORY_MAX)?);
        }
        fields.privacy = input.privacy;

        let (add_texts, del_texts) =
            diff_options(&poll, &input.add_options, &input.del_options)?;

        let add_options = add_texts
            .into_iter()
            .map(|option_text| PollOption {
                owner_user_id: user_id,
                option_text,
                votes: 0,
            })
            .collect();

        let updated = self
            .polls
            .update(poll_id, fields, add_options, del_texts)
            .await?;
        Ok(updated.to_hex())
    }

    pub async fn delete(&self, id: &str, user_id: i64) -> AppResult<String> {
        let poll_id = parse_object_id("id", id)?;
        let poll = self.polls.require_by_id(poll_id).await?;
        if poll.owner_user_id != user_id {
            return Err(AppError::PermissionDenied(
                "Only the poll owner can delete this poll".to_string(),
            ));
        }

        let deleted = self.polls.delete(&poll).await?;
        Ok(deleted.to_hex())
    }

    /// The owner may add options freely; any other user may hold at most one
    /// option of their own on a poll, and none at all on a private poll.
    pub async fn add_option(&self, id: &str, user_id: i64, option_text: &str) -> AppResult<()> {
        let poll_id = parse_object_id("id", id)?;
        let poll = self.polls.require_by_id(poll_id).await?;
        ensure_visible(&poll, Some(user_id))?;

        let option_text = validate_text("option_text", option_text, OPTION_TEXT_MAX)?;

        if poll.owner_user_id != user_id && poll.options_owned_by(user_id) >= 1 {
            return Err(AppError::PermissionDenied(
                "You can only add one option.".to_string(),
            ));
        }

        if poll.has_option(&option_text) {
            return Err(AppError::validation(
                "option_text",
                "This option already exists",
            ));
        }

        self.polls
            .add_option(
                poll_id,
                PollOption {
                    owner_user_id: user_id,
                    option_text,
                    votes: 0,
                },
            )
            .await
    }

    /// Owner-only, deliberately asymmetric with add_option: a non-owner may
    /// not remove any option, not even one they added themselves. Removal is
    /// allowed to take the poll below the two-option creation minimum.
    pub async fn del_option(&self, id: &str, user_id: i64, option_text: &str) -> AppResult<()> {
        let poll_id = parse_object_id("id", id)?;
        let poll = self.polls.require_by_id(poll_id).await?;

        if !poll.has_option(option_text) {
            return Err(AppError::validation(
                "option_text",
                "This option does not exist",
            ));
        }

        if poll.owner_user_id != user_id {
            return Err(AppError::PermissionDenied(
                "Only the poll owner can remove options".to_string(),
            ));
        }

        self.polls.del_option(poll_id, option_text).await
    }

    pub async fn list(
        &self,
        viewer: Option<i64>,
        page: usize,
        page_size: usize,
    ) -> AppResult<Page<PollView>> {
        let polls = self
            .polls
            .list(PollListFilter {
                viewer,
                ..Default::default()
            })
            .await?;
        Ok(paginate(into_views(polls), page, page_size))
    }

    pub async fn list_by_owner(
        &self,
        owner_id: i64,
        viewer: Option<i64>,
        page: usize,
        page_size: usize,
    ) -> AppResult<Page<PollView>> {
        let polls = self
            .polls
            .list(PollListFilter {
                viewer,
                owner: Some(owner_id),
                search: None,
            })
            .await?;
        Ok(paginate(into_views(polls), page, page_size))
    }

    pub async fn search(
        &self,
        query: &str,
        viewer: Option<i64>,
        page: usize,
        page_size: usize,
    ) -> AppResult<Page<PollView>> {
        let query = validate_text("query", query, TITLE_MAX)?;
        let polls = self
            .polls
            .list(PollListFilter {
                viewer,
                owner: None,
                search: Some(query),
            })
            .await?;
        Ok(paginate(into_views(polls), page, page_size))
    }
}

fn into_views(polls: Vec<Poll>) -> Vec<PollView> {
    polls.into_iter().map(PollView::from_poll).collect()
}

/// Normalizes and checks an option list at creation time: 2 to 18 entries,
/// each non-empty and unique.
fn normalize_options(options: &[String]) -> AppResult<Vec<String>> {
    let mut normalized = Vec::with_capacity(options.len());
    for option in options {
        let text = validate_text("options", option, OPTION_TEXT_MAX)?;
        if normalized.contains(&text) {
            return Err(AppError::validation(
                "options",
                "Poll options must be unique",
            ));
        }
        normalized.push(text);
    }

    if normalized.len() < MIN_OPTIONS {
        return Err(AppError::validation(
            "options",
            format!("A poll needs at least {} options", MIN_OPTIONS),
        ));
    }
    if normalized.len() > MAX_OPTIONS {
        return Err(AppError::validation(
            "options",
            format!("A poll can have at most {} options", MAX_OPTIONS),
        ));
    }

    Ok(normalized)
}

/// Validates the add/remove sets of a full update against the current
/// option list: removed options must exist, added options must be new, and
/// the resulting list must stay within the 2..=18 bounds.
fn diff_options(
    poll: &Poll,
    add_options: &[String],
    del_options: &[String],
) -> AppResult<(Vec<String>, Vec<String>)> {
    let mut dels = Vec::with_capacity(del_options.len());
    for option in del_options {
        let text = option.trim();
        if !poll.has_option(text) {
            return Err(AppError::validation(
                "del_options",
                format!("Option \"{}\" does not exist", text),
            ));
        }
        if !dels.contains(&text.to_string()) {
            dels.push(text.to_string());
        }
    }

    let mut adds = Vec::with_capacity(add_options.len());
    for option in add_options {
        let text = validate_text("add_options", option, OPTION_TEXT_MAX)?;
        if dels.contains(&text) {
            return Err(AppError::validation(
                "add_options",
                format!("Option \"{}\" cannot be both added and removed", text),
            ));
        }
        if poll.has_option(&text) || adds.contains(&text) {
            return Err(AppError::validation(
                "add_options",
                format!("Option \"{}\" already exists", text),
            ));
        }
        adds.push(text);
    }

    let resulting = poll.options.len() - dels.len() + adds.len();
    if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&resulting) {
        return Err(AppError::validation(
            "options",
            format!(
                "A poll must keep between {} and {} options",
                MIN_OPTIONS, MAX_OPTIONS
            ),
        ));
    }

    Ok((adds, dels))
}
