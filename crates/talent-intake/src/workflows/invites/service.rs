use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{Invite, InviteStore, NewInvite};
use crate::access::{AccessError, AdminPolicy};
use crate::error::RepositoryError;
use crate::identity::{check_new_password, AuthError, Identity, IdentityAdmin, IdentityId, UserUpdate};
use crate::workflows::intake::validation::{Constraint, FieldValue};

#[derive(Debug, thiserror::Error)]
pub enum InviteError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("Email is required")]
    EmailRequired,
    #[error("Informe um e-mail válido")]
    InvalidEmail,
    #[error("Já existe um convite pendente para este e-mail")]
    AlreadyPending,
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error(transparent)]
    Identity(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

#[derive(Debug, Clone, Serialize)]
pub struct InviteOutcome {
    pub success: bool,
    pub message: String,
    pub invited: Identity,
    /// `None` when the invite went out but the row could not be recorded.
    pub invite: Option<Invite>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmOutcome {
    pub success: bool,
    pub message: String,
    pub user_id: IdentityId,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub actions: Vec<&'static str>,
}

/// The two privileged user-management functions: inviting by e-mail and confirming a user.
pub struct InviteService<I> {
    invites: Arc<I>,
    users: Arc<dyn IdentityAdmin>,
    policy: Arc<AdminPolicy>,
}

impl<I> InviteService<I>
where
    I: InviteStore + 'static,
{
    pub fn new(invites: Arc<I>, users: Arc<dyn IdentityAdmin>, policy: Arc<AdminPolicy>) -> Self {
        Self {
            invites,
            users,
            policy,
        }
    }

    pub async fn invite(
        &self,
        actor: Option<&Identity>,
        email: &str,
    ) -> Result<InviteOutcome, InviteError> {
        let admin = self.policy.authorize_admin(actor)?;
        let email = required_email(email)?;

        if self.invites.find_pending(email).await?.is_some() {
            return Err(InviteError::AlreadyPending);
        }

        let invited = self.users.invite_user_by_email(email).await?;
        info!(%email, invited_by = %admin.id, "invite sent");

        let invite = match self
            .invites
            .insert(NewInvite {
                email: email.to_string(),
                invited_by: admin.id.clone(),
                invited_by_email: admin.email.clone(),
            })
            .await
        {
            Ok(invite) => Some(invite),
            Err(err) => {
                warn!(%email, error = %err, "invite sent but not recorded");
                None
            }
        };

        Ok(InviteOutcome {
            success: true,
            message: format!("Convite enviado para {email}"),
            invited,
            invite,
        })
    }

    /// Confirm a user's e-mail if it is not yet confirmed and set a password when one is given.
    pub async fn confirm_user(
        &self,
        actor: Option<&Identity>,
        email: &str,
        password: Option<&str>,
    ) -> Result<ConfirmOutcome, InviteError> {
        self.policy.authorize_admin(actor)?;
        let email = email.trim();
        if email.is_empty() {
            return Err(InviteError::EmailRequired);
        }
        let password = password.filter(|value| !value.is_empty());
        if let Some(password) = password {
            check_new_password(password, None)?;
        }

        let user = self
            .users
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| InviteError::UserNotFound(email.to_string()))?;

        let update = UserUpdate {
            confirm_email: !user.is_email_confirmed(),
            password: password.map(str::to_string),
        };
        let mut actions = Vec::new();
        if update.confirm_email {
            actions.push("email confirmed");
        }
        if update.password.is_some() {
            actions.push("password updated");
        }

        let updated = if actions.is_empty() {
            user
        } else {
            self.users.update_user(&user.id, update).await?
        };

        let summary = if actions.is_empty() {
            "no changes needed".to_string()
        } else {
            actions.join(", ")
        };
        info!(user_id = %updated.id, %summary, "user confirmed");

        Ok(ConfirmOutcome {
            success: true,
            message: format!("User {email}: {summary}"),
            user_id: updated.id,
            email_confirmed_at: updated.email_confirmed_at,
            actions,
        })
    }
}

fn required_email(raw: &str) -> Result<&str, InviteError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(InviteError::EmailRequired);
    }
    if !Constraint::Email.accepts(&FieldValue::Text(email)) {
        return Err(InviteError::InvalidEmail);
    }
    Ok(email)
}
