use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::compliance::{ComplianceEvaluator, ComplianceVerdict};
use super::domain::{AgencyId, ChecklistError, Document, DocumentKind, Job, JobId, JobStatus};
use super::export::{write_jobs_csv, ExportError};
use super::parse::lenient_timestamp;
use super::report::{DashboardStats, DetailedReview, InvoiceSummary, SummaryAggregator};
use super::repository::{JobRepository, RepositoryError};
use super::review::ReviewRecord;

/// Payload for opening a new job.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub agency_id: AgencyId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Partial edit of a job. Absent fields keep their stored values; any status
/// other than "Compliant" reads as not compliant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<JobStatus>,
}

/// Reference to a file already stored by the upload layer.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentUpload {
    pub file_path: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub uploaded_by: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl DocumentUpload {
    fn into_document(self, now: DateTime<Utc>) -> Document {
        let mut document =
            Document::new(self.file_path, self.original_filename, self.uploaded_by, now);
        document.metadata = self.metadata;
        document
    }
}

/// Service composing the repository, compliance evaluator, and summary aggregator.
pub struct JobComplianceService<R> {
    repository: Arc<R>,
    evaluator: ComplianceEvaluator,
    aggregator: SummaryAggregator,
}

static JOB_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_job_id() -> JobId {
    let id = JOB_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    JobId(format!("job-{id:06}"))
}

impl<R> JobComplianceService<R>
where
    R: JobRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            evaluator: ComplianceEvaluator::new(),
            aggregator: SummaryAggregator::new(),
        }
    }

    /// Open a job with an empty checklist. New jobs are never compliant.
    pub fn create(&self, new_job: NewJob, now: DateTime<Utc>) -> Result<Job, JobServiceError> {
        let title = new_job.title.trim();
        if title.is_empty() {
            return Err(JobServiceError::InvalidJob("title must not be empty".to_string()));
        }
        if new_job.agency_id.0.trim().is_empty() {
            return Err(JobServiceError::InvalidJob(
                "agency_id must not be empty".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (new_job.start_date, new_job.end_date) {
            if end < start {
                return Err(JobServiceError::InvalidJob(
                    "end_date precedes start_date".to_string(),
                ));
            }
        }

        let created_by = new_job
            .created_by
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "Admin".to_string());
        let mut job = Job::new(next_job_id(), new_job.agency_id, title, created_by, now);
        job.description = new_job.description;
        job.start_date = new_job.start_date;
        job.end_date = new_job.end_date;

        // Stores seeded from earlier runs may already hold ids from the sequence.
        let stored = loop {
            match self.repository.insert(job.clone()) {
                Ok(stored) => break stored,
                Err(RepositoryError::Conflict) => {
                    debug!(job_id = %job.id, "job id already taken, drawing the next one");
                    job.id = next_job_id();
                }
                Err(error) => return Err(error.into()),
            }
        };
        info!(job_id = %stored.id, agency_id = %stored.agency_id, "job created");
        Ok(stored)
    }

    pub fn get(&self, job_id: &JobId) -> Result<Job, JobServiceError> {
        let job = self
            .repository
            .fetch(job_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(job)
    }

    pub fn jobs_for_agency(&self, agency_id: &AgencyId) -> Result<Vec<Job>, JobServiceError> {
        Ok(self.repository.list_by_agency(agency_id)?)
    }

    pub fn documents(
        &self,
        job_id: &JobId,
        kind: DocumentKind,
    ) -> Result<Vec<Document>, JobServiceError> {
        let job = self.get(job_id)?;
        Ok(job.checklist.documents(kind).to_vec())
    }

    /// Edit the job's descriptive fields and, when supplied, its status.
    pub fn update_job(
        &self,
        job_id: &JobId,
        update: JobUpdate,
        now: DateTime<Utc>,
    ) -> Result<Job, JobServiceError> {
        let job = self
            .repository
            .modify(job_id, |job| -> Result<Job, JobServiceError> {
                if let Some(title) = update.title {
                    let title = title.trim();
                    if title.is_empty() {
                        return Err(JobServiceError::InvalidJob(
                            "title must not be empty".to_string(),
                        ));
                    }
                    job.title = title.to_string();
                }
                if let Some(description) = update.description {
                    job.description = Some(description).filter(|text| !text.trim().is_empty());
                }
                if update.start_date.is_some() {
                    job.start_date = update.start_date;
                }
                if update.end_date.is_some() {
                    job.end_date = update.end_date;
                }
                if let (Some(start), Some(end)) = (job.start_date, job.end_date) {
                    if end < start {
                        return Err(JobServiceError::InvalidJob(
                            "end_date precedes start_date".to_string(),
                        ));
                    }
                }
                if let Some(status) = update.status {
                    job.status = status;
                }
                job.touch(now);
                Ok(job.clone())
            })?;

        info!(job_id = %job.id, status = %job.status, "job updated");
        Ok(job)
    }

    /// Attach a document and re-run the compliance check on the updated checklist.
    pub fn attach_document(
        &self,
        job_id: &JobId,
        kind: DocumentKind,
        upload: DocumentUpload,
        now: DateTime<Utc>,
    ) -> Result<Job, JobServiceError> {
        let document = upload.into_document(now);
        let (job, verdict) = self
            .repository
            .modify(job_id, |job| -> Result<_, JobServiceError> {
                job.checklist.attach(kind, document);
                let verdict = self.evaluator.apply(job);
                job.touch(now);
                Ok((job.clone(), verdict))
            })?;

        info!(
            job_id = %job.id,
            kind = %kind,
            status = %verdict.status,
            missing = verdict.missing_items.len(),
            "document attached"
        );
        Ok(job)
    }

    /// Remove the document at `index` and re-run the compliance check.
    pub fn remove_document(
        &self,
        job_id: &JobId,
        kind: DocumentKind,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<Document, JobServiceError> {
        let (removed, verdict) = self
            .repository
            .modify(job_id, |job| -> Result<_, JobServiceError> {
                let removed = job.checklist.remove(kind, index)?;
                let verdict = self.evaluator.apply(job);
                job.touch(now);
                Ok((removed, verdict))
            })?;

        info!(
            job_id = %job_id,
            kind = %kind,
            index,
            status = %verdict.status,
            "document removed"
        );
        Ok(removed)
    }

    /// Evaluate the stored checklist and persist the verdict.
    pub fn evaluate(
        &self,
        job_id: &JobId,
        now: DateTime<Utc>,
    ) -> Result<ComplianceVerdict, JobServiceError> {
        let verdict = self
            .repository
            .modify(job_id, |job| -> Result<_, JobServiceError> {
                let verdict = self.evaluator.apply(job);
                job.touch(now);
                Ok(verdict)
            })?;

        if verdict.status.is_compliant() {
            info!(job_id = %job_id, "job compliant");
        } else {
            warn!(
                job_id = %job_id,
                missing = verdict.missing_items.len(),
                "job not compliant"
            );
        }
        Ok(verdict)
    }

    /// Replace the review record. Derived totals and turnaround days are filled
    /// in; outcome fields left blank take the checklist verdict, while outcomes
    /// the reviewer entered are stored as given. The job status is untouched.
    pub fn update_review(
        &self,
        job_id: &JobId,
        mut review: ReviewRecord,
        now: DateTime<Utc>,
    ) -> Result<Job, JobServiceError> {
        review.fill_derived();
        if review.market_bu.is_some() && review.business_unit().is_none() {
            warn!(
                job_id = %job_id,
                market_bu = review.market_bu.as_deref().unwrap_or_default(),
                "review carries an unknown business unit; it will not appear in the summary"
            );
        }

        let job = self
            .repository
            .modify(job_id, |job| -> Result<_, JobServiceError> {
                self.evaluator.complete_review(&job.checklist, &mut review);
                job.review = Some(review);
                job.touch(now);
                Ok(job.clone())
            })?;

        info!(job_id = %job.id, "review updated");
        Ok(job)
    }

    pub fn delete(&self, job_id: &JobId) -> Result<Job, JobServiceError> {
        let removed = self.repository.delete(job_id)?;
        info!(job_id = %job_id, "job deleted");
        Ok(removed)
    }

    /// Validation summary for one agency, or for every agency when `None`.
    pub fn summary(
        &self,
        agency_id: Option<&AgencyId>,
        now: DateTime<Utc>,
    ) -> Result<InvoiceSummary, JobServiceError> {
        let jobs = self.scoped_jobs(agency_id)?;
        Ok(self.aggregator.aggregate(&jobs, now))
    }

    pub fn dashboard(&self) -> Result<DashboardStats, JobServiceError> {
        let jobs = self.repository.list_all()?;
        Ok(DashboardStats::from_jobs(&jobs))
    }

    pub fn detailed_review(&self, agency_id: &AgencyId) -> Result<DetailedReview, JobServiceError> {
        let jobs = self.repository.list_by_agency(agency_id)?;
        Ok(DetailedReview::from_jobs(&jobs))
    }

    /// Write the CSV export for one agency (or all agencies) and return the row count.
    pub fn export_csv<W: Write>(
        &self,
        agency_id: Option<&AgencyId>,
        writer: W,
    ) -> Result<usize, JobServiceError> {
        let jobs = self.scoped_jobs(agency_id)?;
        let written = write_jobs_csv(&jobs, writer)?;
        info!(rows = written, "jobs exported to CSV");
        Ok(written)
    }

    fn scoped_jobs(&self, agency_id: Option<&AgencyId>) -> Result<Vec<Job>, RepositoryError> {
        match agency_id {
            Some(agency_id) => self.repository.list_by_agency(agency_id),
            None => self.repository.list_all(),
        }
    }
}

/// Error raised by the job service.
#[derive(Debug, thiserror::Error)]
pub enum JobServiceError {
    #[error("invalid job: {0}")]
    InvalidJob(String),
    #[error(transparent)]
    Checklist(#[from] ChecklistError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
