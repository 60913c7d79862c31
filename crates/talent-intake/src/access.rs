//! Admin allowlist and the row-level write rules built on top of it.
//!
//! The allowlist is a policy table keyed by identity e-mail. It is read once at startup
//! from the configured source and handed to every service that performs an admin check.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::AdminPolicySource;
use crate::identity::{Identity, IdentityId};

/// One allowlisted administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminEntry {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    admins: Vec<AdminEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct AdminPolicy {
    admins: BTreeMap<String, AdminEntry>,
}

impl AdminPolicy {
    pub fn from_entries(entries: impl IntoIterator<Item = AdminEntry>) -> Self {
        let admins = entries
            .into_iter()
            .filter(|entry| !entry.email.trim().is_empty())
            .map(|entry| (normalize(&entry.email), entry))
            .collect();
        Self { admins }
    }

    pub fn from_emails<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_entries(emails.into_iter().map(|email| AdminEntry {
            email: email.into(),
            label: None,
        }))
    }

    pub fn load(source: &AdminPolicySource) -> Result<Self, PolicyError> {
        match source {
            AdminPolicySource::Inline(emails) => Ok(Self::from_emails(emails.iter().cloned())),
            AdminPolicySource::File(path) => {
                let raw = fs::read_to_string(path).map_err(|source| PolicyError::Read {
                    path: path.clone(),
                    source,
                })?;
                Self::from_json(&raw).map_err(|source| PolicyError::Parse {
                    path: path.clone(),
                    source,
                })
            }
        }
    }

    /// Parses `{"admins": [{"email": "...", "label": "..."}]}`.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let file: PolicyFile = serde_json::from_str(raw)?;
        Ok(Self::from_entries(file.admins))
    }

    pub fn len(&self) -> usize {
        self.admins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }

    /// Allowlisted e-mails, normalized.
    pub fn emails(&self) -> impl Iterator<Item = &str> {
        self.admins.keys().map(String::as_str)
    }

    pub fn is_admin_email(&self, email: Option<&str>) -> bool {
        match email {
            Some(email) => self.admins.contains_key(&normalize(email)),
            None => false,
        }
    }

    pub fn is_admin(&self, identity: &Identity) -> bool {
        self.is_admin_email(Some(&identity.email))
    }

    /// Resolve the caller as an administrator or explain why not.
    pub fn authorize_admin<'a>(
        &self,
        actor: Option<&'a Identity>,
    ) -> Result<&'a Identity, AccessError> {
        let actor = actor.ok_or(AccessError::Unauthenticated)?;
        if self.is_admin(actor) {
            Ok(actor)
        } else {
            Err(AccessError::Forbidden)
        }
    }

    /// Rows owned by an identity are writable by that identity or an admin. Anonymous rows
    /// can only be rewritten by an admin.
    pub fn authorize_row_write(
        &self,
        actor: Option<&Identity>,
        owner: Option<&IdentityId>,
    ) -> Result<(), AccessError> {
        match (actor, owner) {
            (Some(actor), _) if self.is_admin(actor) => Ok(()),
            (Some(actor), Some(owner)) if &actor.id == owner => Ok(()),
            (None, Some(_)) => Err(AccessError::Unauthenticated),
            _ => Err(AccessError::Forbidden),
        }
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("operation restricted to administrators or the record owner")]
    Forbidden,
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("unable to read admin policy {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("admin policy {path:?} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
