use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use super::domain::{ApplicationFormData, ApplicationId};
use super::repository::ApplicationStore;
use super::steps::{Step, StepProgress, StepRegistry};
use super::submission::SubmissionAdapter;
use super::wizard::{Advance, SubmissionStatus, WizardError, WizardState};
use crate::error::RepositoryError;
use crate::identity::{Identity, IdentityId};
use crate::workflows::opportunities::{
    OpportunityError, OpportunityId, OpportunityService, OpportunityStore,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sessions untouched for this long are dropped.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(2 * 60 * 60);

/// Random ids; for anonymous wizards the id is the only credential.
fn next_session_id() -> SessionId {
    SessionId(format!("wiz-{}", Uuid::new_v4().simple()))
}

/// Snapshot of a wizard returned by every session endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub current_step: Step,
    pub form_data: ApplicationFormData,
    pub status: SubmissionStatus,
    pub edit_mode: bool,
    pub edit_target: Option<ApplicationId>,
    pub selected_opportunity: Option<OpportunityId>,
    pub progress: StepProgress,
    pub visible_steps: Vec<Step>,
}

impl SessionView {
    fn of(id: &SessionId, wizard: &WizardState) -> Self {
        Self {
            session_id: id.clone(),
            current_step: wizard.current_step(),
            form_data: wizard.form_data().clone(),
            status: wizard.status().clone(),
            edit_mode: wizard.is_edit_mode(),
            edit_target: wizard.edit_target().cloned(),
            selected_opportunity: wizard.selected_opportunity().cloned(),
            progress: wizard.progress(),
            visible_steps: wizard.visible_steps(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("wizard session not found")]
    SessionNotFound,
    #[error("wizard session belongs to another user")]
    Forbidden,
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Opportunity(#[from] OpportunityError),
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

struct WizardSession {
    owner: Option<IdentityId>,
    wizard: WizardState,
    touched: Instant,
}

impl WizardSession {
    fn is_idle(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.touched) >= ttl
    }
}

/// Server-side wizard sessions. Each wizard sits behind the table mutex, which is released
/// while a submission is in flight. A session opened anonymously only answers anonymous
/// callers; one opened by a signed-in user only answers that user.
pub struct IntakeService<S, O> {
    adapter: SubmissionAdapter<S>,
    opportunities: Arc<OpportunityService<O, S>>,
    registry: StepRegistry,
    idle_ttl: Duration,
    sessions: Mutex<HashMap<SessionId, WizardSession>>,
}

impl<S, O> IntakeService<S, O>
where
    S: ApplicationStore + 'static,
    O: OpportunityStore + 'static,
{
    pub fn new(
        adapter: SubmissionAdapter<S>,
        opportunities: Arc<OpportunityService<O, S>>,
    ) -> Self {
        Self::with_registry(adapter, opportunities, StepRegistry::standard())
    }

    pub fn with_registry(
        adapter: SubmissionAdapter<S>,
        opportunities: Arc<OpportunityService<O, S>>,
        registry: StepRegistry,
    ) -> Self {
        Self {
            adapter,
            opportunities,
            registry,
            idle_ttl: DEFAULT_SESSION_IDLE,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    pub fn open_sessions(&self) -> usize {
        self.table().len()
    }

    pub fn registry(&self) -> StepRegistry {
        self.registry
    }

    /// Start a wizard. A signed-in caller with a stored application gets it prefilled.
    pub async fn open_session(&self, caller: Option<&Identity>) -> Result<SessionView, IntakeError> {
        let mut wizard = WizardState::new(self.registry);
        if let Some(identity) = caller {
            if let Some(record) = self.adapter.store().latest_for_owner(&identity.id).await? {
                wizard.hydrate(&record);
            }
        }

        let id = next_session_id();
        let view = SessionView::of(&id, &wizard);
        let now = Instant::now();
        let mut table = self.table();
        let before = table.len();
        table.retain(|_, session| !session.is_idle(now, self.idle_ttl));
        if table.len() < before {
            debug!(evicted = before - table.len(), "idle wizard sessions dropped");
        }
        table.insert(
            id.clone(),
            WizardSession {
                owner: caller.map(|identity| identity.id.clone()),
                wizard,
                touched: now,
            },
        );
        info!(session_id = %id, edit = view.edit_mode, "wizard session opened");
        Ok(view)
    }

    pub fn view(&self, id: &SessionId, caller: Option<&Identity>) -> Result<SessionView, IntakeError> {
        self.with_wizard(id, caller, |wizard| Ok(SessionView::of(id, wizard)))
    }

    pub fn patch(
        &self,
        id: &SessionId,
        caller: Option<&Identity>,
        fields: &Map<String, Value>,
    ) -> Result<SessionView, IntakeError> {
        self.with_wizard(id, caller, |wizard| {
            wizard.apply_patch(fields)?;
            Ok(SessionView::of(id, wizard))
        })
    }

    pub async fn advance(
        &self,
        id: &SessionId,
        caller: Option<&Identity>,
    ) -> Result<SessionView, IntakeError> {
        let request = match self.with_wizard(id, caller, |wizard| Ok(wizard.begin_advance()?))? {
            Advance::Moved { .. } => return self.view(id, caller),
            Advance::Submit(request) => request,
        };

        let result = self.adapter.submit(&request, caller).await;
        debug!(session_id = %id, ok = result.is_ok(), "submission returned");
        self.with_wizard(id, caller, |wizard| {
            wizard.complete_submission(result)?;
            Ok(SessionView::of(id, wizard))
        })
    }

    pub fn retreat(&self, id: &SessionId, caller: Option<&Identity>) -> Result<SessionView, IntakeError> {
        self.with_wizard(id, caller, |wizard| {
            wizard.retreat();
            Ok(SessionView::of(id, wizard))
        })
    }

    /// Clear the form. Resetting from `sucesso` acknowledges the result and ends the session,
    /// so the returned view is the last one for this id.
    pub fn reset(&self, id: &SessionId, caller: Option<&Identity>) -> Result<SessionView, IntakeError> {
        let (view, finished) = self.with_wizard(id, caller, |wizard| {
            let finished = wizard.current_step() == Step::Sucesso;
            wizard.reset();
            Ok((SessionView::of(id, wizard), finished))
        })?;
        if finished {
            self.table().remove(id);
            info!(session_id = %id, "wizard session finished");
        }
        Ok(view)
    }

    /// Pick (or clear) the opportunity on the intro step and start the flow.
    pub async fn select_opportunity(
        &self,
        id: &SessionId,
        caller: Option<&Identity>,
        opportunity: Option<OpportunityId>,
        today: NaiveDate,
    ) -> Result<SessionView, IntakeError> {
        // fail fast on an unknown session before touching the store
        self.view(id, caller)?;
        if let Some(opportunity_id) = &opportunity {
            self.opportunities
                .ensure_selectable(opportunity_id, today)
                .await?;
        }
        self.with_wizard(id, caller, |wizard| {
            wizard.select_opportunity(opportunity);
            Ok(SessionView::of(id, wizard))
        })
    }

    pub fn close(&self, id: &SessionId, caller: Option<&Identity>) -> Result<(), IntakeError> {
        self.with_wizard(id, caller, |_| Ok(()))?;
        self.table().remove(id);
        debug!(session_id = %id, "wizard session closed");
        Ok(())
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, WizardSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_wizard<R>(
        &self,
        id: &SessionId,
        caller: Option<&Identity>,
        apply: impl FnOnce(&mut WizardState) -> Result<R, IntakeError>,
    ) -> Result<R, IntakeError> {
        let now = Instant::now();
        let mut table = self.table();
        let session = table.get_mut(id).ok_or(IntakeError::SessionNotFound)?;
        if session.is_idle(now, self.idle_ttl) {
            table.remove(id);
            debug!(session_id = %id, "idle wizard session dropped");
            return Err(IntakeError::SessionNotFound);
        }
        if caller.map(|identity| &identity.id) != session.owner.as_ref() {
            return Err(IntakeError::Forbidden);
        }
        session.touched = now;
        apply(&mut session.wizard)
    }
}
