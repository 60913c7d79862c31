//! Port to the hosted identity service.
//!
//! Sign-up, sign-in, sessions, and the admin user-management calls are consumed from the
//! backend provider; nothing here hashes passwords or mints tokens.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub const MIN_PASSWORD_CHARS: usize = 6;

/// Opaque user id issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityId(pub String);

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub email: String,
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn is_email_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    pub identity: Identity,
}

/// Broadcast whenever a session starts or ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    SignedIn(Identity),
    SignedOut(IdentityId),
}

/// Failures reported by the identity service, collapsed to what the sign-in modal shows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already registered")]
    AlreadyRegistered,
    #[error("password shorter than 6 characters")]
    WeakPassword,
    #[error("password confirmation does not match")]
    PasswordMismatch,
    #[error("identity service failure: {0}")]
    Service(String),
}

impl AuthError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "E-mail ou senha incorretos",
            AuthError::AlreadyRegistered => "Este e-mail já está cadastrado",
            AuthError::WeakPassword => "A senha deve ter pelo menos 6 caracteres",
            AuthError::PasswordMismatch => "As senhas não coincidem",
            AuthError::Service(_) => "Ocorreu um erro. Tente novamente.",
        }
    }
}

/// Local checks the sign-up form performs before calling the provider.
pub fn check_new_password(password: &str, confirmation: Option<&str>) -> Result<(), AuthError> {
    if let Some(confirmation) = confirmation {
        if confirmation != password {
            return Err(AuthError::PasswordMismatch);
        }
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;
    async fn sign_out(&self, token: &SessionToken) -> Result<(), AuthError>;
    async fn reset_password(&self, email: &str) -> Result<(), AuthError>;
    async fn resend_confirmation(&self, email: &str) -> Result<(), AuthError>;
    async fn get_session(&self, token: &SessionToken) -> Result<Option<Identity>, AuthError>;
    fn subscribe(&self) -> broadcast::Receiver<SessionChange>;
}

/// Changes requested through the admin user-management call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub confirm_email: bool,
    pub password: Option<String>,
}

/// Privileged calls that only the serverless functions make.
#[async_trait]
pub trait IdentityAdmin: Send + Sync {
    async fn invite_user_by_email(&self, email: &str) -> Result<Identity, AuthError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError>;
    async fn update_user(&self, id: &IdentityId, update: UserUpdate)
        -> Result<Identity, AuthError>;
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<SessionToken> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(SessionToken(token.to_string()))
    }
}

/// Resolve the caller of a request, treating unknown or expired tokens as anonymous.
pub async fn resolve_caller<P>(provider: &P, headers: &HeaderMap) -> Result<Option<Identity>, AuthError>
where
    P: IdentityProvider + ?Sized,
{
    match bearer_token(headers) {
        Some(token) => provider.get_session(&token).await,
        None => Ok(None),
    }
}
