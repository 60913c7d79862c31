use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RepositoryError;
use crate::identity::IdentityId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InviteId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Expired,
}

/// Row in the `invites` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub id: InviteId,
    pub email: String,
    pub invited_by: IdentityId,
    pub invited_by_email: String,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvite {
    pub email: String,
    pub invited_by: IdentityId,
    pub invited_by_email: String,
}

#[async_trait]
pub trait InviteStore: Send + Sync {
    async fn find_pending(&self, email: &str) -> Result<Option<Invite>, RepositoryError>;
    async fn insert(&self, invite: NewInvite) -> Result<Invite, RepositoryError>;
}
