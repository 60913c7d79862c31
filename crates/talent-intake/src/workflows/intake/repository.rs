use async_trait::async_trait;

use super::domain::{ApplicationId, ApplicationPayload, ApplicationRecord, ApplicationStatus};
use crate::error::RepositoryError;
use crate::identity::IdentityId;
use crate::workflows::opportunities::OpportunityId;

/// Row access to the `applications` table so the wizard and the review board can be
/// exercised without the hosted backend.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn insert(&self, payload: ApplicationPayload)
        -> Result<ApplicationRecord, RepositoryError>;
    async fn update(
        &self,
        id: &ApplicationId,
        payload: ApplicationPayload,
    ) -> Result<ApplicationRecord, RepositoryError>;
    async fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
    /// Most recently created row owned by `owner`.
    async fn latest_for_owner(
        &self,
        owner: &IdentityId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError>;
    /// Every row, newest first.
    async fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError>;
    async fn set_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicationRecord, RepositoryError>;
    async fn count_for_opportunity(&self, id: &OpportunityId) -> Result<usize, RepositoryError>;
}
