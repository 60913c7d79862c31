use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::board::{ReviewBoard, StatusCounts, StatusFilter};
use super::export::{export_file_name, to_csv_string, ExportError};
use crate::access::{AccessError, AdminPolicy};
use crate::error::RepositoryError;
use crate::identity::Identity;
use crate::workflows::intake::domain::{ApplicationId, ApplicationRecord, ApplicationStatus};
use crate::workflows::intake::repository::ApplicationStore;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewQuery {
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewListing {
    pub applications: Vec<ApplicationRecord>,
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("application not found")]
    NotFound,
    #[error(transparent)]
    Store(RepositoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl From<RepositoryError> for ReviewError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => ReviewError::NotFound,
            other => ReviewError::Store(other),
        }
    }
}

/// Admin review of submitted applications over a cached board.
pub struct ReviewService<S> {
    store: Arc<S>,
    policy: Arc<AdminPolicy>,
    board: Mutex<Option<ReviewBoard>>,
}

impl<S> ReviewService<S>
where
    S: ApplicationStore + 'static,
{
    pub fn new(store: Arc<S>, policy: Arc<AdminPolicy>) -> Self {
        Self {
            store,
            policy,
            board: Mutex::new(None),
        }
    }

    fn board(&self) -> MutexGuard<'_, Option<ReviewBoard>> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn refresh(&self) -> Result<(), ReviewError> {
        let records = self.store.list().await?;
        *self.board() = Some(ReviewBoard::new(records));
        Ok(())
    }

    /// Reload every application and return the tab/search view with per-status counts.
    pub async fn list(
        &self,
        actor: Option<&Identity>,
        query: &ReviewQuery,
    ) -> Result<ReviewListing, ReviewError> {
        self.policy.authorize_admin(actor)?;
        self.refresh().await?;

        let guard = self.board();
        let listing = guard.as_ref().map_or_else(
            || ReviewListing {
                applications: Vec::new(),
                counts: StatusCounts::default(),
            },
            |board| ReviewListing {
                applications: board
                    .filtered(query.status, &query.search)
                    .into_iter()
                    .cloned()
                    .collect(),
                counts: board.counts(),
            },
        );
        Ok(listing)
    }

    /// CSV of the filtered view from the cached board. The store is only read when nothing
    /// has been loaded yet.
    pub async fn export(
        &self,
        actor: Option<&Identity>,
        query: &ReviewQuery,
        today: NaiveDate,
    ) -> Result<CsvExport, ReviewError> {
        self.policy.authorize_admin(actor)?;
        if self.board().is_none() {
            self.refresh().await?;
        }

        let body = {
            let guard = self.board();
            let visible = guard
                .as_ref()
                .map(|board| board.filtered(query.status, &query.search))
                .unwrap_or_default();
            to_csv_string(visible)?
        };
        let file_name = export_file_name(today);
        info!(%file_name, "applications exported");
        Ok(CsvExport { file_name, body })
    }

    /// Apply the new status to the cached board first, then persist it. A refused write
    /// puts the previous status back.
    pub async fn update_status(
        &self,
        actor: Option<&Identity>,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicationRecord, ReviewError> {
        self.policy.authorize_admin(actor)?;

        let previous = self
            .board()
            .as_mut()
            .and_then(|board| board.apply_status(id, status));

        match self.store.set_status(id, status).await {
            Ok(updated) => {
                if let Some(board) = self.board().as_mut() {
                    board.replace(updated.clone());
                }
                info!(application_id = %id, status = status.as_str(), "application status changed");
                Ok(updated)
            }
            Err(err) => {
                if let (Some(previous), Some(board)) = (previous, self.board().as_mut()) {
                    board.apply_status(id, previous);
                }
                warn!(application_id = %id, error = %err, "status change rolled back");
                Err(err.into())
            }
        }
    }

    /// Cached status of one application, as the dashboard currently shows it.
    pub fn cached_status(&self, id: &ApplicationId) -> Option<ApplicationStatus> {
        self.board()
            .as_ref()
            .and_then(|board| board.get(id))
            .map(|record| record.status)
    }
}
