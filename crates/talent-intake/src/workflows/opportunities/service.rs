use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::domain::{Opportunity, OpportunityForm, OpportunityId};
use super::repository::OpportunityStore;
use crate::access::{AccessError, AdminPolicy};
use crate::error::RepositoryError;
use crate::identity::Identity;
use crate::workflows::intake::repository::ApplicationStore;
use crate::workflows::intake::validation::ValidationReport;

/// Admin management of opportunities plus the public listing the intro step shows.
pub struct OpportunityService<O, S> {
    opportunities: Arc<O>,
    applications: Arc<S>,
    policy: Arc<AdminPolicy>,
}

impl<O, S> OpportunityService<O, S>
where
    O: OpportunityStore + 'static,
    S: ApplicationStore + 'static,
{
    pub fn new(opportunities: Arc<O>, applications: Arc<S>, policy: Arc<AdminPolicy>) -> Self {
        Self {
            opportunities,
            applications,
            policy,
        }
    }

    pub async fn list_all(
        &self,
        actor: Option<&Identity>,
    ) -> Result<Vec<Opportunity>, OpportunityError> {
        self.policy.authorize_admin(actor)?;
        Ok(self.opportunities.list().await?)
    }

    /// Active opportunities whose date window includes `today`, newest first.
    pub async fn list_open(&self, today: NaiveDate) -> Result<Vec<Opportunity>, OpportunityError> {
        let mut listed = self.opportunities.list().await?;
        listed.retain(|opportunity| opportunity.is_open_on(today));
        Ok(listed)
    }

    pub async fn create(
        &self,
        actor: Option<&Identity>,
        form: OpportunityForm,
    ) -> Result<Opportunity, OpportunityError> {
        let admin = self.policy.authorize_admin(actor)?;
        ensure_valid(&form)?;
        let created = self
            .opportunities
            .insert(&form, Some(admin.id.clone()))
            .await?;
        info!(opportunity_id = %created.id, title = %created.title, "opportunity created");
        Ok(created)
    }

    pub async fn update(
        &self,
        actor: Option<&Identity>,
        id: &OpportunityId,
        form: OpportunityForm,
    ) -> Result<Opportunity, OpportunityError> {
        self.policy.authorize_admin(actor)?;
        ensure_valid(&form)?;
        let updated = self.opportunities.update(id, &form).await?;
        info!(opportunity_id = %id, "opportunity updated");
        Ok(updated)
    }

    pub async fn toggle(
        &self,
        actor: Option<&Identity>,
        id: &OpportunityId,
    ) -> Result<Opportunity, OpportunityError> {
        self.policy.authorize_admin(actor)?;
        let current = self
            .opportunities
            .fetch(id)
            .await?
            .ok_or(OpportunityError::NotFound)?;
        let toggled = self
            .opportunities
            .set_active(id, !current.is_active)
            .await?;
        info!(opportunity_id = %id, active = toggled.is_active, "opportunity toggled");
        Ok(toggled)
    }

    pub async fn delete(
        &self,
        actor: Option<&Identity>,
        id: &OpportunityId,
    ) -> Result<(), OpportunityError> {
        self.policy.authorize_admin(actor)?;
        self.opportunities.delete(id).await?;
        info!(opportunity_id = %id, "opportunity deleted");
        Ok(())
    }

    /// An opportunity can be picked in the wizard while it is open and under its cap.
    pub async fn ensure_selectable(
        &self,
        id: &OpportunityId,
        today: NaiveDate,
    ) -> Result<Opportunity, OpportunityError> {
        let opportunity = self
            .opportunities
            .fetch(id)
            .await?
            .ok_or(OpportunityError::NotFound)?;
        if !opportunity.is_open_on(today) {
            return Err(OpportunityError::Closed);
        }
        let applications = self.applications.count_for_opportunity(id).await?;
        if !opportunity.has_room(applications) {
            warn!(opportunity_id = %id, applications, "opportunity is full");
            return Err(OpportunityError::Full);
        }
        Ok(opportunity)
    }
}

fn ensure_valid(form: &OpportunityForm) -> Result<(), OpportunityError> {
    let report = form.validate();
    if report.valid {
        Ok(())
    } else {
        Err(OpportunityError::Invalid(report))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OpportunityError {
    #[error("opportunity form has invalid fields")]
    Invalid(ValidationReport),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("opportunity not found")]
    NotFound,
    #[error("opportunity is not accepting applications")]
    Closed,
    #[error("opportunity reached its application limit")]
    Full,
    #[error(transparent)]
    Store(RepositoryError),
}

impl From<RepositoryError> for OpportunityError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => OpportunityError::NotFound,
            other => OpportunityError::Store(other),
        }
    }
}

impl OpportunityError {
    pub fn user_message(&self) -> &'static str {
        match self {
            OpportunityError::Invalid(_) => "Verifique os campos destacados",
            OpportunityError::Access(AccessError::Unauthenticated) => "Faça login para continuar",
            OpportunityError::Access(AccessError::Forbidden) => "Acesso restrito a administradores",
            OpportunityError::NotFound => "Oportunidade não encontrada",
            OpportunityError::Closed => "Esta oportunidade não está mais disponível",
            OpportunityError::Full => "Esta oportunidade atingiu o limite de candidaturas",
            OpportunityError::Store(_) => "Erro ao salvar. Tente novamente.",
        }
    }
}
