use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use talent_intake::error::RepositoryError;
use talent_intake::identity::{
    AuthError, Identity, IdentityAdmin, IdentityId, IdentityProvider, Session, SessionChange,
    SessionToken, UserUpdate,
};
use talent_intake::storage::{BlobError, BlobStore};
use talent_intake::workflows::intake::{
    ApplicationId, ApplicationPayload, ApplicationRecord, ApplicationStatus, ApplicationStore,
};
use talent_intake::workflows::invites::{Invite, InviteId, InviteStatus, InviteStore, NewInvite};
use talent_intake::workflows::opportunities::{
    Opportunity, OpportunityForm, OpportunityId, OpportunityStore,
};
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn next_id(sequence: &AtomicU64, prefix: &str) -> String {
    let value = sequence.fetch_add(1, Ordering::Relaxed) + 1;
    format!("{prefix}-{:x}-{value:04}", Utc::now().timestamp_millis())
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationStore {
    records: Arc<Mutex<Vec<ApplicationRecord>>>,
    sequence: Arc<AtomicU64>,
}

#[async_trait]
impl ApplicationStore for InMemoryApplicationStore {
    async fn insert(
        &self,
        payload: ApplicationPayload,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let now = Utc::now();
        let record = ApplicationRecord {
            id: ApplicationId(next_id(&self.sequence, "app")),
            payload,
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        locked(&self.records).push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: &ApplicationId,
        payload: ApplicationPayload,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = locked(&self.records);
        let record = guard
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or(RepositoryError::NotFound)?;
        record.payload = payload;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(locked(&self.records)
            .iter()
            .find(|record| &record.id == id)
            .cloned())
    }

    async fn latest_for_owner(
        &self,
        owner: &IdentityId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(locked(&self.records)
            .iter()
            .filter(|record| record.owner() == Some(owner))
            .max_by_key(|record| record.created_at)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let mut listed = locked(&self.records).clone();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn set_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = locked(&self.records);
        let record = guard
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or(RepositoryError::NotFound)?;
        record.status = status;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn count_for_opportunity(&self, id: &OpportunityId) -> Result<usize, RepositoryError> {
        Ok(locked(&self.records)
            .iter()
            .filter(|record| record.payload.opportunity_id.as_ref() == Some(id))
            .count())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryOpportunityStore {
    rows: Arc<Mutex<Vec<Opportunity>>>,
    sequence: Arc<AtomicU64>,
}

#[async_trait]
impl OpportunityStore for InMemoryOpportunityStore {
    async fn list(&self) -> Result<Vec<Opportunity>, RepositoryError> {
        let mut listed = locked(&self.rows).clone();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn fetch(&self, id: &OpportunityId) -> Result<Option<Opportunity>, RepositoryError> {
        Ok(locked(&self.rows).iter().find(|row| &row.id == id).cloned())
    }

    async fn insert(
        &self,
        form: &OpportunityForm,
        created_by: Option<IdentityId>,
    ) -> Result<Opportunity, RepositoryError> {
        let id = OpportunityId(next_id(&self.sequence, "opp"));
        let created = form.to_opportunity(id, created_by, Utc::now());
        locked(&self.rows).push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: &OpportunityId,
        form: &OpportunityForm,
    ) -> Result<Opportunity, RepositoryError> {
        let mut guard = locked(&self.rows);
        let row = guard
            .iter_mut()
            .find(|row| &row.id == id)
            .ok_or(RepositoryError::NotFound)?;
        form.apply_to(row, Utc::now());
        Ok(row.clone())
    }

    async fn set_active(
        &self,
        id: &OpportunityId,
        active: bool,
    ) -> Result<Opportunity, RepositoryError> {
        let mut guard = locked(&self.rows);
        let row = guard
            .iter_mut()
            .find(|row| &row.id == id)
            .ok_or(RepositoryError::NotFound)?;
        row.is_active = active;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete(&self, id: &OpportunityId) -> Result<(), RepositoryError> {
        let mut guard = locked(&self.rows);
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
pub(crate) struct InMemoryInviteStore {
    rows: Arc<Mutex<Vec<Invite>>>,
    sequence: Arc<AtomicU64>,
}

#[async_trait]
impl InviteStore for InMemoryInviteStore {
    async fn find_pending(&self, email: &str) -> Result<Option<Invite>, RepositoryError> {
        Ok(locked(&self.rows)
            .iter()
            .find(|invite| {
                invite.status == InviteStatus::Pending && invite.email.eq_ignore_ascii_case(email)
            })
            .cloned())
    }

    async fn insert(&self, invite: NewInvite) -> Result<Invite, RepositoryError> {
        let created = Invite {
            id: InviteId(next_id(&self.sequence, "inv")),
            email: invite.email,
            invited_by: invite.invited_by,
            invited_by_email: invite.invited_by_email,
            status: InviteStatus::Pending,
            created_at: Utc::now(),
        };
        locked(&self.rows).push(created.clone());
        Ok(created)
    }
}

/// Bucket contents keyed by `bucket/path`.
#[derive(Default, Clone)]
pub(crate) struct InMemoryBlobStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), BlobError> {
        let key = format!("{bucket}/{path}");
        let mut guard = locked(&self.objects);
        if guard.contains_key(&key) {
            return Err(BlobError::AlreadyExists);
        }
        debug!(%key, %content_type, size = bytes.len(), "blob stored");
        guard.insert(key, bytes);
        Ok(())
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), BlobError> {
        let mut guard = locked(&self.objects);
        for path in paths {
            guard.remove(&format!("{bucket}/{path}"));
        }
        Ok(())
    }
}

struct Account {
    identity: Identity,
    password: String,
}

/// Local stand-in for the hosted identity service. Passwords are kept as given; this is
/// for development runs only.
#[derive(Clone)]
pub(crate) struct InMemoryIdentity {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    sessions: Arc<Mutex<HashMap<SessionToken, IdentityId>>>,
    sequence: Arc<AtomicU64>,
    changes: broadcast::Sender<SessionChange>,
}

impl Default for InMemoryIdentity {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            accounts: Arc::default(),
            sessions: Arc::default(),
            sequence: Arc::default(),
            changes,
        }
    }
}

impl InMemoryIdentity {
    /// Register a confirmed account, replacing any previous one for the e-mail.
    pub(crate) fn with_confirmed_account(self, email: &str, password: &str) -> Self {
        let identity = Identity {
            id: IdentityId(next_id(&self.sequence, "usr")),
            email: normalize(email),
            email_confirmed_at: Some(Utc::now()),
        };
        locked(&self.accounts).insert(
            normalize(email),
            Account {
                identity,
                password: password.to_string(),
            },
        );
        self
    }

    fn identity_of(&self, id: &IdentityId) -> Option<Identity> {
        locked(&self.accounts)
            .values()
            .find(|account| &account.identity.id == id)
            .map(|account| account.identity.clone())
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let key = normalize(email);
        let mut accounts = locked(&self.accounts);
        if accounts.contains_key(&key) {
            return Err(AuthError::AlreadyRegistered);
        }
        let identity = Identity {
            id: IdentityId(next_id(&self.sequence, "usr")),
            email: key.clone(),
            email_confirmed_at: None,
        };
        accounts.insert(
            key,
            Account {
                identity: identity.clone(),
                password: password.to_string(),
            },
        );
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let identity = {
            let accounts = locked(&self.accounts);
            match accounts.get(&normalize(email)) {
                Some(account) if !account.password.is_empty() && account.password == password => {
                    account.identity.clone()
                }
                _ => return Err(AuthError::InvalidCredentials),
            }
        };
        let token = SessionToken(next_id(&self.sequence, "tok"));
        locked(&self.sessions).insert(token.clone(), identity.id.clone());
        // nobody listening is fine
        let _ = self.changes.send(SessionChange::SignedIn(identity.clone()));
        Ok(Session { token, identity })
    }

    async fn sign_out(&self, token: &SessionToken) -> Result<(), AuthError> {
        if let Some(id) = locked(&self.sessions).remove(token) {
            let _ = self.changes.send(SessionChange::SignedOut(id));
        }
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        debug!(email = %normalize(email), "password reset requested");
        Ok(())
    }

    async fn resend_confirmation(&self, email: &str) -> Result<(), AuthError> {
        debug!(email = %normalize(email), "confirmation e-mail requested");
        Ok(())
    }

    async fn get_session(&self, token: &SessionToken) -> Result<Option<Identity>, AuthError> {
        let id = locked(&self.sessions).get(token).cloned();
        Ok(id.and_then(|id| self.identity_of(&id)))
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }
}

#[async_trait]
impl IdentityAdmin for InMemoryIdentity {
    async fn invite_user_by_email(&self, email: &str) -> Result<Identity, AuthError> {
        let key = normalize(email);
        let mut accounts = locked(&self.accounts);
        if let Some(account) = accounts.get(&key) {
            return Ok(account.identity.clone());
        }
        let identity = Identity {
            id: IdentityId(next_id(&self.sequence, "usr")),
            email: key.clone(),
            email_confirmed_at: None,
        };
        accounts.insert(
            key,
            Account {
                identity: identity.clone(),
                password: String::new(),
            },
        );
        Ok(identity)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError> {
        Ok(locked(&self.accounts)
            .get(&normalize(email))
            .map(|account| account.identity.clone()))
    }

    async fn update_user(
        &self,
        id: &IdentityId,
        update: UserUpdate,
    ) -> Result<Identity, AuthError> {
        let mut accounts = locked(&self.accounts);
        let account = accounts
            .values_mut()
            .find(|account| &account.identity.id == id)
            .ok_or_else(|| AuthError::Service(format!("user {id} not found")))?;
        if update.confirm_email {
            account.identity.email_confirmed_at = Some(Utc::now());
        }
        if let Some(password) = update.password {
            account.password = password;
        }
        Ok(account.identity.clone())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
