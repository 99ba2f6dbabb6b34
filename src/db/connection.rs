use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, ClientSession, Collection, Database, IndexModel};

use crate::models::comment_models::Comment;
use crate::models::poll_models::Poll;
use crate::models::user_action_models::UserAction;
use crate::utils::error::{AppError, AppResult};

pub const POLLS_COLLECTION: &str = "polls";
pub const USER_ACTIONS_COLLECTION: &str = "user_actions";
pub const COMMENTS_COLLECTION: &str = "comments";

const DEFAULT_TXN_DEADLINE_SECS: u64 = 10;

/// Connection settings, read once from the environment and passed in
/// explicitly. Nothing here is a hidden global.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub mongo_uri: String,
    pub db_name: String,
    pub app_name: String,
    /// Upper bound applied to each multi-document transaction.
    pub txn_deadline: Duration,
}

impl StoreConfig {
    pub fn from_env() -> AppResult<Self> {
        dotenv().ok();

        let mongo_uri = env::var("MONGO_URI")
            .map_err(|_| AppError::Database("MONGO_URI must be set".to_string()))?;
        let db_name = env::var("DB_NAME")
            .map_err(|_| AppError::Database("DB_NAME must be set".to_string()))?;
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "pollhub".to_string());
        let txn_deadline = env::var("TXN_DEADLINE_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map_or(Duration::from_secs(DEFAULT_TXN_DEADLINE_SECS), Duration::from_secs);

        Ok(Self {
            mongo_uri,
            db_name,
            app_name,
            txn_deadline,
        })
    }
}

/// Gateway to the document store. Constructed once at process start and
/// handed to the repositories; `Client` and `Database` handles are cheap to
/// clone. Construction is fail-fast: a connection that cannot be established
/// is an error, never a half-usable client.
#[derive(Clone)]
pub struct PollStore {
    client: Client,
    db: Database,
    txn_deadline: Duration,
}

impl PollStore {
    pub async fn connect(config: &StoreConfig) -> AppResult<Self> {
        let mut client_options = ClientOptions::parse(&config.mongo_uri)
            .await
            .map_err(|e| AppError::Database(format!("Failed to parse MongoDB URI: {}", e)))?;

        client_options.app_name = Some(config.app_name.clone());

        let client = Client::with_options(client_options)
            .map_err(|e| AppError::Database(format!("Failed to initialize MongoDB client: {}", e)))?;

        let db = client.database(&config.db_name);

        // The driver connects lazily; ping now so a bad deployment surfaces
        // here instead of on the first request.
        db.run_command(doc! { "ping": 1 }).await.map_err(|e| {
            tracing::error!(error = %e, "failed to reach MongoDB");
            AppError::Database(format!("Failed to reach MongoDB: {}", e))
        })?;

        tracing::info!(db = %config.db_name, "database connection established");

        Ok(Self {
            client,
            db,
            txn_deadline: config.txn_deadline,
        })
    }

    pub async fn start_session(&self) -> AppResult<ClientSession> {
        Ok(self.client.start_session().await?)
    }

    pub fn txn_deadline(&self) -> Duration {
        self.txn_deadline
    }

    pub fn polls(&self) -> Collection<Poll> {
        self.db.collection::<Poll>(POLLS_COLLECTION)
    }

    pub fn user_actions(&self) -> Collection<UserAction> {
        self.db.collection::<UserAction>(USER_ACTIONS_COLLECTION)
    }

    pub fn comments(&self) -> Collection<Comment> {
        self.db.collection::<Comment>(COMMENTS_COLLECTION)
    }

    /// Declares the indexes the engine relies on:
    /// a unique index on user_actions (user_id, poll_id), which closes the
    /// concurrent duplicate-vote race at the storage layer, and the text
    /// index backing keyword search over polls.
    pub async fn ensure_indexes(&self) -> AppResult<()> {
        let unique_user_poll = IndexModel::builder()
            .keys(doc! { "user_id": 1, "poll_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.user_actions().create_index(unique_user_poll).await?;

        let poll_text = IndexModel::builder()
            .keys(doc! { "title": "text", "description": "text", "category": "text" })
            .build();
        self.polls().create_index(poll_text).await?;

        let comment_poll = IndexModel::builder()
            .keys(doc! { "poll_id": 1 })
            .build();
        self.comments().create_index(comment_poll).await?;

        tracing::info!("database indexes ensured");
        Ok(())
    }
}
