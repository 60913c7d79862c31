use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{ApplicationFormData, ApplicationId, ApplicationPayload, OTHER_OPTION};
use super::repository::ApplicationStore;
use crate::access::{AccessError, AdminPolicy};
use crate::error::RepositoryError;
use crate::identity::{Identity, IdentityId};
use crate::workflows::opportunities::OpportunityId;

pub const GENERIC_SUBMISSION_MESSAGE: &str =
    "Ocorreu um erro ao enviar sua inscrição. Por favor, tente novamente.";
pub const CONFIRM_EMAIL_MESSAGE: &str =
    "Por favor, confirme seu e-mail antes de enviar a inscrição. Verifique sua caixa de entrada.";

/// Everything the wizard hands over when the last data step passes validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub form: ApplicationFormData,
    pub edit_target: Option<ApplicationId>,
    pub opportunity: Option<OpportunityId>,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("owner e-mail is not confirmed")]
    EmailNotConfirmed,
    #[error(transparent)]
    Unauthorized(#[from] AccessError),
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl SubmissionError {
    /// Banner text for the submit step. Authorization and service failures read the same.
    pub fn user_message(&self) -> &'static str {
        match self {
            SubmissionError::EmailNotConfirmed => CONFIRM_EMAIL_MESSAGE,
            SubmissionError::Unauthorized(_) | SubmissionError::Store(_) => {
                GENERIC_SUBMISSION_MESSAGE
            }
        }
    }
}

/// Persists a completed wizard as one `applications` row.
pub struct SubmissionAdapter<S> {
    store: Arc<S>,
    policy: Arc<AdminPolicy>,
}

impl<S> Clone for SubmissionAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: Arc::clone(&self.policy),
        }
    }
}

impl<S> SubmissionAdapter<S>
where
    S: ApplicationStore + 'static,
{
    pub fn new(store: Arc<S>, policy: Arc<AdminPolicy>) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Insert or update the owner's row. Without an explicit edit target a signed-in owner's
    /// latest row is looked up first and updated in place, so an owner keeps a single row.
    pub async fn submit(
        &self,
        request: &SubmissionRequest,
        owner: Option<&Identity>,
    ) -> Result<ApplicationId, SubmissionError> {
        if owner.is_some_and(|identity| !identity.is_email_confirmed()) {
            warn!("submission refused: owner e-mail not confirmed");
            return Err(SubmissionError::EmailNotConfirmed);
        }

        let mut payload = to_payload(
            &request.form,
            owner.map(|identity| identity.id.clone()),
            request.opportunity.clone(),
            Utc::now(),
        );

        let target = match (&request.edit_target, owner) {
            (Some(id), _) => Some(id.clone()),
            (None, Some(identity)) => self
                .store
                .latest_for_owner(&identity.id)
                .await
                .map_err(|err| log_store_failure("latest row lookup", err))?
                .map(|record| record.id),
            (None, None) => None,
        };

        let result = match target {
            Some(id) => {
                let existing = self
                    .store
                    .fetch(&id)
                    .await
                    .map_err(|err| log_store_failure("fetch", err))?
                    .ok_or(RepositoryError::NotFound)?;
                self.policy
                    .authorize_row_write(owner, existing.owner())
                    .inspect_err(|err| warn!(application_id = %id, error = %err, "update refused"))?;
                // an admin editing someone else's row must not take it over
                if existing.payload.user_id.is_some() {
                    payload.user_id = existing.payload.user_id.clone();
                }
                self.store.update(&id, payload).await
            }
            None => self.store.insert(payload).await,
        };

        let record = result.map_err(|err| log_store_failure("write", err))?;
        let owner_label = record
            .owner()
            .map_or_else(|| "anonymous".to_string(), IdentityId::to_string);
        info!(application_id = %record.id, owner = %owner_label, "application submitted");
        Ok(record.id)
    }
}

fn log_store_failure(operation: &'static str, err: RepositoryError) -> SubmissionError {
    warn!(operation, error = %err, "application store call failed");
    SubmissionError::Store(err)
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Map wizard values onto the persisted row.
///
/// Blank optional answers become `None`, experience details are dropped unless the candidate
/// reported experience, and the `Outro` option is replaced by the free text typed next to it.
pub fn to_payload(
    form: &ApplicationFormData,
    owner: Option<IdentityId>,
    opportunity: Option<OpportunityId>,
    now: DateTime<Utc>,
) -> ApplicationPayload {
    let experience = |value: &Option<String>| {
        if form.has_experience {
            blank_to_none(value)
        } else {
            None
        }
    };

    let experience_type = if form.experience_type.as_deref() == Some(OTHER_OPTION) {
        experience(&form.experience_type_other)
    } else {
        experience(&form.experience_type)
    };

    let (how_did_you_hear, how_did_you_hear_other) = if form.how_did_you_hear == OTHER_OPTION {
        let other = blank_to_none(&form.how_did_you_hear_other);
        (
            other.clone().unwrap_or_else(|| OTHER_OPTION.to_string()),
            other,
        )
    } else {
        (form.how_did_you_hear.clone(), None)
    };

    ApplicationPayload {
        full_name: form.full_name.clone(),
        birth_date: form.birth_date.clone(),
        email: form.email.clone(),
        whatsapp: form.whatsapp.clone(),
        city: form.city.clone(),
        institution: form.institution.clone(),
        course: form.course.clone(),
        current_period: form.current_period.clone(),
        study_shift: form.study_shift.clone(),
        graduation_month: form.graduation_month.filter(|month| *month != 0),
        graduation_year: form.graduation_year.filter(|year| *year != 0),
        interest_areas: form.interest_areas.clone(),
        interest_other: blank_to_none(&form.interest_other),
        motivation: form.motivation.clone(),
        contributions: form.contributions.clone(),
        tools: blank_to_none(&form.tools),
        has_experience: form.has_experience,
        experience_type,
        experience_org: experience(&form.experience_org),
        experience_period: experience(&form.experience_period),
        experience_activities: experience(&form.experience_activities),
        experience_learnings: experience(&form.experience_learnings),
        extra_info: blank_to_none(&form.extra_info),
        how_did_you_hear,
        how_did_you_hear_other,
        cv_url: blank_to_none(&form.cv_url),
        lgpd_consent: form.lgpd_consent,
        lgpd_consent_date: form.lgpd_consent.then_some(now),
        user_id: owner,
        opportunity_id: opportunity,
    }
}
