use async_trait::async_trait;

use super::domain::{Opportunity, OpportunityForm, OpportunityId};
use crate::error::RepositoryError;
use crate::identity::IdentityId;

/// Row access to the `opportunities` table.
#[async_trait]
pub trait OpportunityStore: Send + Sync {
    /// Every row, newest first.
    async fn list(&self) -> Result<Vec<Opportunity>, RepositoryError>;
    async fn fetch(&self, id: &OpportunityId) -> Result<Option<Opportunity>, RepositoryError>;
    async fn insert(
        &self,
        form: &OpportunityForm,
        created_by: Option<IdentityId>,
    ) -> Result<Opportunity, RepositoryError>;
    async fn update(
        &self,
        id: &OpportunityId,
        form: &OpportunityForm,
    ) -> Result<Opportunity, RepositoryError>;
    async fn set_active(
        &self,
        id: &OpportunityId,
        active: bool,
    ) -> Result<Opportunity, RepositoryError>;
    async fn delete(&self, id: &OpportunityId) -> Result<(), RepositoryError>;
}
