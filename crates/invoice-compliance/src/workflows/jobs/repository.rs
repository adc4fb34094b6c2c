use serde::Serialize;

use super::domain::{AgencyId, Job, JobId, JobStatus};

/// Storage abstraction so the job service can be exercised in isolation.
pub trait JobRepository: Send + Sync {
    fn insert(&self, job: Job) -> Result<Job, RepositoryError>;
    fn update(&self, job: Job) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &JobId) -> Result<Option<Job>, RepositoryError>;
    /// Jobs of one agency, newest first.
    fn list_by_agency(&self, agency_id: &AgencyId) -> Result<Vec<Job>, RepositoryError>;
    fn list_all(&self) -> Result<Vec<Job>, RepositoryError>;
    fn delete(&self, id: &JobId) -> Result<Job, RepositoryError>;
    /// Runs `mutate` against the stored job while holding the store's write
    /// lock. The change is persisted only when `mutate` returns `Ok`.
    fn modify<T, E, F>(&self, id: &JobId, mutate: F) -> Result<T, E>
    where
        F: FnOnce(&mut Job) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Compact job listing used by the agency job table.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusView {
    pub id: JobId,
    pub agency_id: AgencyId,
    pub title: String,
    pub status: JobStatus,
    pub documents_attached: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_review_outcome: Option<String>,
}

impl From<&Job> for JobStatusView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            agency_id: job.agency_id.clone(),
            title: job.title.clone(),
            status: job.status,
            documents_attached: job
                .checklist
                .presence()
                .iter()
                .map(|presence| presence.count)
                .sum(),
            initial_review_outcome: job
                .review
                .as_ref()
                .and_then(|review| review.initial_review_outcome.clone()),
        }
    }
}
