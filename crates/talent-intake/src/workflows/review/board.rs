use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::workflows::intake::domain::{ApplicationId, ApplicationRecord, ApplicationStatus};

/// Dashboard status tab: everything, or one status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum StatusFilter {
    #[default]
    All,
    Only(ApplicationStatus),
}

impl StatusFilter {
    pub fn matches(self, status: ApplicationStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        ApplicationStatus::parse(value)
            .map(StatusFilter::Only)
            .ok_or_else(|| format!("unknown status filter '{value}'"))
    }
}

impl TryFrom<String> for StatusFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub all: usize,
    pub pending: usize,
    pub reviewing: usize,
    pub approved: usize,
    pub rejected: usize,
}

/// Cached copy of every application, newest first, as the dashboard holds it.
#[derive(Debug, Clone, Default)]
pub struct ReviewBoard {
    records: Vec<ApplicationRecord>,
}

impl ReviewBoard {
    pub fn new(mut records: Vec<ApplicationRecord>) -> Self {
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self { records }
    }

    pub fn records(&self) -> &[ApplicationRecord] {
        &self.records
    }

    pub fn get(&self, id: &ApplicationId) -> Option<&ApplicationRecord> {
        self.records.iter().find(|record| &record.id == id)
    }

    /// Records in the chosen tab whose name, e-mail or course contains `search`
    /// (case-insensitive). A blank search matches everything.
    pub fn filtered(&self, filter: StatusFilter, search: &str) -> Vec<&ApplicationRecord> {
        let needle = search.trim().to_lowercase();
        self.records
            .iter()
            .filter(|record| filter.matches(record.status))
            .filter(|record| needle.is_empty() || matches_search(record, &needle))
            .collect()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts {
            all: self.records.len(),
            ..StatusCounts::default()
        };
        for record in &self.records {
            match record.status {
                ApplicationStatus::Pending => counts.pending += 1,
                ApplicationStatus::Reviewing => counts.reviewing += 1,
                ApplicationStatus::Approved => counts.approved += 1,
                ApplicationStatus::Rejected => counts.rejected += 1,
            }
        }
        counts
    }

    /// Set a cached record's status, returning the one it replaced.
    pub fn apply_status(
        &mut self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Option<ApplicationStatus> {
        let record = self.records.iter_mut().find(|record| &record.id == id)?;
        Some(std::mem::replace(&mut record.status, status))
    }

    /// Swap in the server's copy of a record after a confirmed write.
    pub fn replace(&mut self, updated: ApplicationRecord) {
        if let Some(record) = self.records.iter_mut().find(|record| record.id == updated.id) {
            *record = updated;
        }
    }
}

fn matches_search(record: &ApplicationRecord, needle: &str) -> bool {
    [
        &record.payload.full_name,
        &record.payload.email,
        &record.payload.course,
    ]
    .into_iter()
    .any(|value| value.to_lowercase().contains(needle))
}
