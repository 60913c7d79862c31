//! In-memory ports and fixtures shared by the workflow test modules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{header, HeaderValue};
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::access::AdminPolicy;
use crate::config::IntakeConfig;
use crate::error::RepositoryError;
use crate::identity::{
    AuthError, Identity, IdentityAdmin, IdentityId, IdentityProvider, Session, SessionChange,
    SessionToken, UserUpdate,
};
use crate::storage::{BlobError, BlobStore, CvUploader};
use crate::workflows::intake::domain::{
    ApplicationFormData, ApplicationId, ApplicationPayload, ApplicationRecord, ApplicationStatus,
};
use crate::workflows::intake::repository::ApplicationStore;
use crate::workflows::intake::submission::{to_payload, SubmissionAdapter};
use crate::workflows::intake::IntakeService;
use crate::workflows::invites::{Invite, InviteId, InviteStatus, InviteStore, NewInvite};
use crate::workflows::opportunities::{
    Opportunity, OpportunityForm, OpportunityId, OpportunityService, OpportunityStore,
};

pub(crate) const ADMIN_EMAIL: &str = "rh@example.org";

pub(crate) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn identity(id: &str, email: &str, confirmed: bool) -> Identity {
    Identity {
        id: IdentityId(id.to_string()),
        email: email.to_string(),
        email_confirmed_at: confirmed.then(base_time),
    }
}

pub(crate) fn admin() -> Identity {
    identity("admin-1", ADMIN_EMAIL, true)
}

pub(crate) fn candidate() -> Identity {
    identity("user-7", "ana@example.org", true)
}

pub(crate) fn other_candidate() -> Identity {
    identity("user-8", "bia@example.org", true)
}

pub(crate) fn unconfirmed_candidate() -> Identity {
    identity("user-9", "caio@example.org", false)
}

pub(crate) fn policy() -> Arc<AdminPolicy> {
    Arc::new(AdminPolicy::from_emails([ADMIN_EMAIL]))
}

/// Complete answers for a candidate without prior experience.
pub(crate) fn valid_form() -> ApplicationFormData {
    ApplicationFormData {
        full_name: "Ana Souza".to_string(),
        birth_date: "2002-05-14".to_string(),
        email: "ana@example.org".to_string(),
        whatsapp: "(61) 99999-0000".to_string(),
        city: "Brasília".to_string(),
        institution: "UnB".to_string(),
        course: "Engenharia de Redes".to_string(),
        current_period: "5º".to_string(),
        study_shift: "Noturno".to_string(),
        graduation_month: Some(12),
        graduation_year: Some(2026),
        interest_areas: vec!["Redes e Infraestrutura".to_string()],
        motivation: "Quero aprender com projetos reais de rede.".to_string(),
        contributions: "Organização e vontade de aprender.".to_string(),
        has_experience: false,
        how_did_you_hear: "LinkedIn".to_string(),
        lgpd_consent: true,
        ..ApplicationFormData::default()
    }
}

pub(crate) fn experienced_form() -> ApplicationFormData {
    ApplicationFormData {
        has_experience: true,
        experience_type: Some("Estágio anterior".to_string()),
        experience_org: Some("Giga Redes".to_string()),
        experience_period: Some("2023-2024".to_string()),
        experience_activities: Some("Suporte a usuários e cabeamento".to_string()),
        experience_learnings: Some("Atendimento e documentação técnica".to_string()),
        ..valid_form()
    }
}

pub(crate) fn record(
    id: &str,
    full_name: &str,
    status: ApplicationStatus,
    minutes_after_base: i64,
) -> ApplicationRecord {
    let form = ApplicationFormData {
        full_name: full_name.to_string(),
        ..valid_form()
    };
    let created_at = base_time() + Duration::minutes(minutes_after_base);
    ApplicationRecord {
        id: ApplicationId(id.to_string()),
        payload: to_payload(&form, None, None, created_at),
        status,
        created_at,
        updated_at: created_at,
    }
}

pub(crate) fn opportunity_form(title: &str) -> OpportunityForm {
    OpportunityForm {
        title: title.to_string(),
        location: "Brasília - DF".to_string(),
        weekly_hours: 30,
        ..OpportunityForm::default()
    }
}

pub(crate) fn intake_config() -> IntakeConfig {
    IntakeConfig {
        cv_max_bytes: 1024 * 1024,
        storage_public_url: "https://files.example.org/public".to_string(),
    }
}

pub(crate) type TestIntake = IntakeService<MemoryApplicationStore, MemoryOpportunityStore>;

/// Intake service wired to fresh in-memory stores.
pub(crate) fn build_intake() -> (
    Arc<TestIntake>,
    MemoryApplicationStore,
    MemoryOpportunityStore,
) {
    let applications = MemoryApplicationStore::default();
    let opportunities = MemoryOpportunityStore::default();
    let service = intake_with(applications.clone(), opportunities.clone());
    (service, applications, opportunities)
}

pub(crate) fn intake_with(
    applications: MemoryApplicationStore,
    opportunities: MemoryOpportunityStore,
) -> Arc<TestIntake> {
    Arc::new(unshared_intake(applications, opportunities))
}

/// Intake service whose sessions go idle after `idle_ttl`.
pub(crate) fn intake_idling_after(idle_ttl: std::time::Duration) -> Arc<TestIntake> {
    Arc::new(
        unshared_intake(
            MemoryApplicationStore::default(),
            MemoryOpportunityStore::default(),
        )
        .with_idle_ttl(idle_ttl),
    )
}

fn unshared_intake(
    applications: MemoryApplicationStore,
    opportunities: MemoryOpportunityStore,
) -> TestIntake {
    let applications = Arc::new(applications);
    let adapter = SubmissionAdapter::new(applications.clone(), policy());
    let opportunity_service = Arc::new(OpportunityService::new(
        Arc::new(opportunities),
        applications,
        policy(),
    ));
    IntakeService::new(adapter, opportunity_service)
}

pub(crate) fn uploader(blobs: MemoryBlobs) -> Arc<CvUploader<MemoryBlobs>> {
    Arc::new(CvUploader::new(Arc::new(blobs), &intake_config()))
}

#[derive(Default, Clone)]
pub(crate) struct MemoryApplicationStore {
    records: Arc<Mutex<Vec<ApplicationRecord>>>,
    sequence: Arc<AtomicU64>,
    reject_status: Arc<AtomicBool>,
}

impl MemoryApplicationStore {
    pub(crate) fn seeded(records: Vec<ApplicationRecord>) -> Self {
        let store = Self::default();
        *store.records.lock().expect("store mutex poisoned") = records;
        store
    }

    pub(crate) fn records(&self) -> Vec<ApplicationRecord> {
        self.records.lock().expect("store mutex poisoned").clone()
    }

    /// Make every following `set_status` call fail.
    pub(crate) fn reject_status_changes(&self) {
        self.reject_status.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ApplicationStore for MemoryApplicationStore {
    async fn insert(
        &self,
        payload: ApplicationPayload,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let created_at = base_time() + Duration::seconds(sequence as i64);
        let record = ApplicationRecord {
            id: ApplicationId(format!("app-{sequence:06}")),
            payload,
            status: ApplicationStatus::Pending,
            created_at,
            updated_at: created_at,
        };
        self.records
            .lock()
            .expect("store mutex poisoned")
            .push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: &ApplicationId,
        payload: ApplicationPayload,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let record = guard
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or(RepositoryError::NotFound)?;
        record.payload = payload;
        record.updated_at = record.updated_at + Duration::seconds(1);
        Ok(record.clone())
    }

    async fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }

    async fn latest_for_owner(
        &self,
        owner: &IdentityId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| record.owner() == Some(owner))
            .max_by_key(|record| record.created_at)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let mut listed = self.records();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn set_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicationRecord, RepositoryError> {
        if self.reject_status.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("database offline".to_string()));
        }
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let record = guard
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or(RepositoryError::NotFound)?;
        record.status = status;
        Ok(record.clone())
    }

    async fn count_for_opportunity(&self, id: &OpportunityId) -> Result<usize, RepositoryError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| record.payload.opportunity_id.as_ref() == Some(id))
            .count())
    }
}

/// Every call fails as if the backend were down.
pub(crate) struct UnavailableApplicationStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

#[async_trait]
impl ApplicationStore for UnavailableApplicationStore {
    async fn insert(&self, _payload: ApplicationPayload) -> Result<ApplicationRecord, RepositoryError> {
        offline()
    }

    async fn update(
        &self,
        _id: &ApplicationId,
        _payload: ApplicationPayload,
    ) -> Result<ApplicationRecord, RepositoryError> {
        offline()
    }

    async fn fetch(&self, _id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        offline()
    }

    async fn latest_for_owner(
        &self,
        _owner: &IdentityId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        offline()
    }

    async fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        offline()
    }

    async fn set_status(
        &self,
        _id: &ApplicationId,
        _status: ApplicationStatus,
    ) -> Result<ApplicationRecord, RepositoryError> {
        offline()
    }

    async fn count_for_opportunity(&self, _id: &OpportunityId) -> Result<usize, RepositoryError> {
        offline()
    }
}

#[derive(Default, Clone)]
pub(crate) struct MemoryOpportunityStore {
    rows: Arc<Mutex<Vec<Opportunity>>>,
    sequence: Arc<AtomicU64>,
}

impl MemoryOpportunityStore {
    pub(crate) fn rows(&self) -> Vec<Opportunity> {
        self.rows.lock().expect("store mutex poisoned").clone()
    }

    /// Insert a row built from `form` and hand back its id.
    pub(crate) fn seed(&self, form: &OpportunityForm) -> OpportunityId {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let id = OpportunityId(format!("opp-{sequence:04}"));
        let created = form.to_opportunity(
            id.clone(),
            None,
            base_time() + Duration::seconds(sequence as i64),
        );
        self.rows
            .lock()
            .expect("store mutex poisoned")
            .push(created);
        id
    }
}

#[async_trait]
impl OpportunityStore for MemoryOpportunityStore {
    async fn list(&self) -> Result<Vec<Opportunity>, RepositoryError> {
        let mut listed = self.rows();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn fetch(&self, id: &OpportunityId) -> Result<Option<Opportunity>, RepositoryError> {
        let guard = self.rows.lock().expect("store mutex poisoned");
        Ok(guard.iter().find(|row| &row.id == id).cloned())
    }

    async fn insert(
        &self,
        form: &OpportunityForm,
        created_by: Option<IdentityId>,
    ) -> Result<Opportunity, RepositoryError> {
        let id = self.seed(form);
        let mut guard = self.rows.lock().expect("store mutex poisoned");
        let row = guard
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(RepositoryError::NotFound)?;
        row.created_by = created_by;
        Ok(row.clone())
    }

    async fn update(
        &self,
        id: &OpportunityId,
        form: &OpportunityForm,
    ) -> Result<Opportunity, RepositoryError> {
        let mut guard = self.rows.lock().expect("store mutex poisoned");
        let row = guard
            .iter_mut()
            .find(|row| &row.id == id)
            .ok_or(RepositoryError::NotFound)?;
        let now = row.updated_at + Duration::seconds(1);
        form.apply_to(row, now);
        Ok(row.clone())
    }

    async fn set_active(
        &self,
        id: &OpportunityId,
        active: bool,
    ) -> Result<Opportunity, RepositoryError> {
        let mut guard = self.rows.lock().expect("store mutex poisoned");
        let row = guard
            .iter_mut()
            .find(|row| &row.id == id)
            .ok_or(RepositoryError::NotFound)?;
        row.is_active = active;
        Ok(row.clone())
    }

    async fn delete(&self, id: &OpportunityId) -> Result<(), RepositoryError> {
        let mut guard = self.rows.lock().expect("store mutex poisoned");
        let before = guard.len();
        guard.retain(|row| &row.id != id);
        if guard.len() == before {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }
}

#[derive(Default, Clone)]
pub(crate) struct MemoryBlobs {
    pub(crate) uploaded: Arc<Mutex<Vec<String>>>,
    pub(crate) removed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn upload(
        &self,
        _bucket: &str,
        path: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<(), BlobError> {
        self.uploaded
            .lock()
            .expect("blob mutex poisoned")
            .push(path.to_string());
        Ok(())
    }

    async fn remove(&self, _bucket: &str, paths: &[String]) -> Result<(), BlobError> {
        self.removed
            .lock()
            .expect("blob mutex poisoned")
            .extend(paths.iter().cloned());
        Ok(())
    }
}

struct Account {
    identity: Identity,
    password: String,
}

/// Identity service double: accounts keyed by e-mail, sessions keyed by token.
#[derive(Clone)]
pub(crate) struct FakeIdentity {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    sessions: Arc<Mutex<HashMap<SessionToken, Identity>>>,
    sequence: Arc<AtomicU64>,
    offline: Arc<AtomicBool>,
    changes: broadcast::Sender<SessionChange>,
}

impl Default for FakeIdentity {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            accounts: Arc::default(),
            sessions: Arc::default(),
            sequence: Arc::default(),
            offline: Arc::default(),
            changes,
        }
    }
}

impl FakeIdentity {
    /// Register `identity` with an open session and return its bearer header.
    pub(crate) fn signed_in(&self, identity: &Identity) -> HeaderValue {
        self.accounts.lock().expect("identity mutex poisoned").insert(
            identity.email.clone(),
            Account {
                identity: identity.clone(),
                password: "segredo123".to_string(),
            },
        );
        let token = format!("tok-{}", identity.id);
        self.sessions
            .lock()
            .expect("identity mutex poisoned")
            .insert(SessionToken(token.clone()), identity.clone());
        HeaderValue::from_str(&format!("Bearer {token}")).expect("valid header")
    }

    pub(crate) fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub(crate) fn account(&self, email: &str) -> Option<Identity> {
        self.accounts
            .lock()
            .expect("identity mutex poisoned")
            .get(email)
            .map(|account| account.identity.clone())
    }

    fn check_online(&self) -> Result<(), AuthError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(AuthError::Service("identity service offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn next_id(&self) -> IdentityId {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        IdentityId(format!("new-{sequence}"))
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.check_online()?;
        let mut accounts = self.accounts.lock().expect("identity mutex poisoned");
        if accounts.contains_key(email) {
            return Err(AuthError::AlreadyRegistered);
        }
        let created = Identity {
            id: self.next_id(),
            email: email.to_string(),
            email_confirmed_at: None,
        };
        accounts.insert(
            email.to_string(),
            Account {
                identity: created.clone(),
                password: password.to_string(),
            },
        );
        Ok(created)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.check_online()?;
        let identity = {
            let accounts = self.accounts.lock().expect("identity mutex poisoned");
            match accounts.get(email) {
                Some(account) if account.password == password => account.identity.clone(),
                _ => return Err(AuthError::InvalidCredentials),
            }
        };
        let token = SessionToken(format!("tok-{}", identity.id));
        self.sessions
            .lock()
            .expect("identity mutex poisoned")
            .insert(token.clone(), identity.clone());
        let _ = self.changes.send(SessionChange::SignedIn(identity.clone()));
        Ok(Session { token, identity })
    }

    async fn sign_out(&self, token: &SessionToken) -> Result<(), AuthError> {
        self.check_online()?;
        let removed = self
            .sessions
            .lock()
            .expect("identity mutex poisoned")
            .remove(token);
        if let Some(identity) = removed {
            let _ = self.changes.send(SessionChange::SignedOut(identity.id));
        }
        Ok(())
    }

    async fn reset_password(&self, _email: &str) -> Result<(), AuthError> {
        self.check_online()
    }

    async fn resend_confirmation(&self, _email: &str) -> Result<(), AuthError> {
        self.check_online()
    }

    async fn get_session(&self, token: &SessionToken) -> Result<Option<Identity>, AuthError> {
        self.check_online()?;
        Ok(self
            .sessions
            .lock()
            .expect("identity mutex poisoned")
            .get(token)
            .cloned())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }
}

#[async_trait]
impl IdentityAdmin for FakeIdentity {
    async fn invite_user_by_email(&self, email: &str) -> Result<Identity, AuthError> {
        self.check_online()?;
        let mut accounts = self.accounts.lock().expect("identity mutex poisoned");
        if let Some(account) = accounts.get(email) {
            return Ok(account.identity.clone());
        }
        let invited = Identity {
            id: self.next_id(),
            email: email.to_string(),
            email_confirmed_at: None,
        };
        accounts.insert(
            email.to_string(),
            Account {
                identity: invited.clone(),
                password: String::new(),
            },
        );
        Ok(invited)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError> {
        self.check_online()?;
        Ok(self.account(email))
    }

    async fn update_user(
        &self,
        id: &IdentityId,
        update: UserUpdate,
    ) -> Result<Identity, AuthError> {
        self.check_online()?;
        let mut accounts = self.accounts.lock().expect("identity mutex poisoned");
        let account = accounts
            .values_mut()
            .find(|account| &account.identity.id == id)
            .ok_or_else(|| AuthError::Service("user not found".to_string()))?;
        if update.confirm_email {
            account.identity.email_confirmed_at = Some(base_time());
        }
        if let Some(password) = update.password {
            account.password = password;
        }
        Ok(account.identity.clone())
    }
}

#[derive(Default, Clone)]
pub(crate) struct MemoryInvites {
    rows: Arc<Mutex<Vec<Invite>>>,
    reject_inserts: bool,
}

impl MemoryInvites {
    pub(crate) fn rejecting_inserts() -> Self {
        Self {
            reject_inserts: true,
            ..Self::default()
        }
    }

    pub(crate) fn rows(&self) -> Vec<Invite> {
        self.rows.lock().expect("invite mutex poisoned").clone()
    }
}

#[async_trait]
impl InviteStore for MemoryInvites {
    async fn find_pending(&self, email: &str) -> Result<Option<Invite>, RepositoryError> {
        let guard = self.rows.lock().expect("invite mutex poisoned");
        Ok(guard
            .iter()
            .find(|invite| invite.email == email && invite.status == InviteStatus::Pending)
            .cloned())
    }

    async fn insert(&self, invite: NewInvite) -> Result<Invite, RepositoryError> {
        if self.reject_inserts {
            return Err(RepositoryError::Forbidden);
        }
        let mut guard = self.rows.lock().expect("invite mutex poisoned");
        let created = Invite {
            id: InviteId(format!("inv-{}", guard.len() + 1)),
            email: invite.email,
            invited_by: invite.invited_by,
            invited_by_email: invite.invited_by_email,
            status: InviteStatus::Pending,
            created_at: base_time(),
        };
        guard.push(created.clone());
        Ok(created)
    }
}

pub(crate) fn bearer(value: HeaderValue) -> axum::http::HeaderMap {
    let mut headers = axum::http::HeaderMap::new();
    headers.insert(header::AUTHORIZATION, value);
    headers
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
