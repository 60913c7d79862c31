//! Wizard state machine.
//!
//! Forward moves are validated against the current step's schema; the move out of the last
//! data step is a submission and goes through two phases so that callers holding the wizard
//! behind a lock can release it while the adapter call is in flight:
//! [`WizardState::begin_advance`] hands back a [`SubmissionRequest`] and marks the wizard as
//! submitting, [`WizardState::complete_submission`] applies the adapter's answer.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::domain::{ApplicationFormData, ApplicationId, ApplicationRecord};
use super::repository::ApplicationStore;
use super::steps::{Step, StepKind, StepProgress, StepRegistry, Transition};
use super::submission::{SubmissionAdapter, SubmissionError, SubmissionRequest};
use super::validation::{validate_step_in, validate_submission_in, ValidationReport};
use crate::identity::Identity;
use crate::workflows::opportunities::OpportunityId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed {
        reason: String,
    },
}

/// Result of a successful [`WizardState::begin_advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Moved { from: Step, to: Step },
    Submit(SubmissionRequest),
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("step has invalid fields")]
    Invalid(ValidationReport),
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("the wizard has already finished")]
    Finished,
    #[error("submission failed: {reason}")]
    SubmissionFailed { reason: String },
    #[error("invalid form patch: {0}")]
    InvalidPatch(String),
}

#[derive(Debug, Clone)]
pub struct WizardState {
    registry: StepRegistry,
    current_step: Step,
    form_data: ApplicationFormData,
    status: SubmissionStatus,
    edit_target: Option<ApplicationId>,
    selected_opportunity: Option<OpportunityId>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new(StepRegistry::standard())
    }
}

impl WizardState {
    pub fn new(registry: StepRegistry) -> Self {
        Self {
            current_step: registry.initial(),
            registry,
            form_data: ApplicationFormData::default(),
            status: SubmissionStatus::Idle,
            edit_target: None,
            selected_opportunity: None,
        }
    }

    /// Fresh wizard prefilled from a stored row; submitting it updates that row.
    pub fn hydrated(registry: StepRegistry, record: &ApplicationRecord) -> Self {
        let mut wizard = Self::new(registry);
        wizard.hydrate(record);
        wizard
    }

    pub fn current_step(&self) -> Step {
        self.current_step
    }

    pub fn form_data(&self) -> &ApplicationFormData {
        &self.form_data
    }

    pub fn status(&self) -> &SubmissionStatus {
        &self.status
    }

    pub fn edit_target(&self) -> Option<&ApplicationId> {
        self.edit_target.as_ref()
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_target.is_some()
    }

    pub fn selected_opportunity(&self) -> Option<&OpportunityId> {
        self.selected_opportunity.as_ref()
    }

    pub fn progress(&self) -> StepProgress {
        self.registry.progress(self.current_step)
    }

    pub fn visible_steps(&self) -> Vec<Step> {
        self.registry.visible_steps(&self.form_data)
    }

    fn current_kind(&self) -> Option<StepKind> {
        self.registry
            .definition(self.current_step)
            .map(|definition| definition.kind)
    }

    /// Validate the current step and either move on or hand back the submission to run.
    pub fn begin_advance(&mut self) -> Result<Advance, WizardError> {
        if self.status == SubmissionStatus::Submitting {
            return Err(WizardError::SubmissionInFlight);
        }

        let from = self.current_step;
        match self.registry.next(from, &self.form_data) {
            Transition::Stay => Err(WizardError::Finished),
            Transition::Step(to) => {
                let report = validate_step_in(&self.registry, from, &self.form_data);
                if !report.valid {
                    debug!(step = %from, fields = report.errors.len(), "advance blocked by validation");
                    return Err(WizardError::Invalid(report));
                }
                self.current_step = to;
                self.status = SubmissionStatus::Idle;
                info!(%from, %to, "wizard advanced");
                Ok(Advance::Moved { from, to })
            }
            Transition::Submit => {
                let report = validate_submission_in(&self.registry, &self.form_data);
                if !report.valid {
                    debug!(step = %from, fields = report.errors.len(), "submission blocked by validation");
                    return Err(WizardError::Invalid(report));
                }
                self.status = SubmissionStatus::Submitting;
                info!(step = %from, edit = self.is_edit_mode(), "submission started");
                Ok(Advance::Submit(SubmissionRequest {
                    form: self.form_data.clone(),
                    edit_target: self.edit_target.clone(),
                    opportunity: self.selected_opportunity.clone(),
                }))
            }
        }
    }

    /// Apply the adapter's answer to a submission started by [`Self::begin_advance`].
    ///
    /// A result arriving after the user stepped back still lands; one arriving after a reset
    /// is dropped.
    pub fn complete_submission(
        &mut self,
        result: Result<ApplicationId, SubmissionError>,
    ) -> Result<Step, WizardError> {
        if self.status != SubmissionStatus::Submitting {
            debug!(step = %self.current_step, "discarding submission result for a reset wizard");
            return Ok(self.current_step);
        }

        match result {
            Ok(id) => {
                self.current_step = self.registry.terminal();
                self.status = SubmissionStatus::Succeeded;
                info!(application_id = %id, "submission succeeded");
                Ok(self.current_step)
            }
            Err(err) => {
                let reason = err.user_message().to_string();
                warn!(step = %self.current_step, error = %err, "submission failed");
                self.status = SubmissionStatus::Failed {
                    reason: reason.clone(),
                };
                Err(WizardError::SubmissionFailed { reason })
            }
        }
    }

    /// Forward move that runs the submission inline.
    pub async fn advance<S>(
        &mut self,
        adapter: &SubmissionAdapter<S>,
        owner: Option<&Identity>,
    ) -> Result<Step, WizardError>
    where
        S: ApplicationStore + 'static,
    {
        match self.begin_advance()? {
            Advance::Moved { to, .. } => Ok(to),
            Advance::Submit(request) => {
                let result = adapter.submit(&request, owner).await;
                self.complete_submission(result)
            }
        }
    }

    /// Step back to the nearest non-skipped step. Never validates; a no-op on the intro and
    /// terminal steps.
    pub fn retreat(&mut self) -> Step {
        if let Some(previous) = self.registry.previous(self.current_step, &self.form_data) {
            info!(from = %self.current_step, to = %previous, "wizard retreated");
            self.current_step = previous;
        }
        self.current_step
    }

    /// Clear entered values and return to the intro. The edit target and the chosen
    /// opportunity survive, so a signed-in owner still updates their own row.
    pub fn reset(&mut self) {
        self.form_data = ApplicationFormData::default();
        self.current_step = self.registry.initial();
        self.status = SubmissionStatus::Idle;
        info!("wizard reset");
    }

    /// Replace the form with a stored row's values and target that row on submit.
    pub fn hydrate(&mut self, record: &ApplicationRecord) {
        self.form_data = record.to_form_data();
        self.edit_target = Some(record.id.clone());
        self.selected_opportunity = record.payload.opportunity_id.clone();
        debug!(application_id = %record.id, "wizard hydrated from stored application");
    }

    /// Record the opportunity picked on the intro step and start the flow.
    pub fn select_opportunity(&mut self, opportunity: Option<OpportunityId>) -> Step {
        self.selected_opportunity = opportunity;
        if self.current_kind() == Some(StepKind::Intro) {
            if let Transition::Step(first) = self.registry.next(self.current_step, &self.form_data)
            {
                info!(from = %self.current_step, to = %first, "wizard started");
                self.current_step = first;
            }
        }
        self.current_step
    }

    /// Merge entered values into the form. Keys must name form fields; values must have the
    /// field's JSON type.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<(), WizardError> {
        let mut current = match serde_json::to_value(&self.form_data) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(WizardError::InvalidPatch("form is not an object".to_string())),
            Err(err) => return Err(WizardError::InvalidPatch(err.to_string())),
        };

        if let Some(unknown) = patch.keys().find(|key| !current.contains_key(*key)) {
            return Err(WizardError::InvalidPatch(format!("unknown field '{unknown}'")));
        }

        for (key, value) in patch {
            current.insert(key.clone(), value.clone());
        }

        self.form_data = serde_json::from_value(Value::Object(current))
            .map_err(|err| WizardError::InvalidPatch(err.to_string()))?;
        Ok(())
    }
}
