use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::AppResult;

/// Denormalized owner/author summary attached to poll and comment output.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct OwnerSummary {
    pub username: String,
    pub display_name: String,
    pub profile_picture: Option<String>,
}

/// Profile lookup collaborator. Lives outside this crate; read paths treat
/// any failure as missing decoration instead of propagating it.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn get_owner_summary(&self, user_id: i64) -> AppResult<OwnerSummary>;
}
