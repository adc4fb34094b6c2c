use chrono::{DateTime, NaiveDate, Utc};
use invoice_compliance::error::AppError;
use invoice_compliance::workflows::jobs::{AgencyId, Job, JobId, JobRepository, RepositoryError};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryJobRepository {
    jobs: Arc<Mutex<HashMap<JobId, Job>>>,
}

impl InMemoryJobRepository {
    pub(crate) fn seeded(jobs: Vec<Job>) -> Result<Self, RepositoryError> {
        let repository = Self::default();
        for job in jobs {
            repository.insert(job)?;
        }
        Ok(repository)
    }
}

impl JobRepository for InMemoryJobRepository {
    fn insert(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut guard = self.jobs.lock().expect("repository mutex poisoned");
        if guard.contains_key(&job.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    fn update(&self, job: Job) -> Result<(), RepositoryError> {
        let mut guard = self.jobs.lock().expect("repository mutex poisoned");
        if guard.contains_key(&job.id) {
            guard.insert(job.id.clone(), job);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        let guard = self.jobs.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_by_agency(&self, agency_id: &AgencyId) -> Result<Vec<Job>, RepositoryError> {
        let guard = self.jobs.lock().expect("repository mutex poisoned");
        let mut jobs: Vec<Job> = guard
            .values()
            .filter(|job| &job.agency_id == agency_id)
            .cloned()
            .collect();
        jobs.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(jobs)
    }

    fn list_all(&self) -> Result<Vec<Job>, RepositoryError> {
        let guard = self.jobs.lock().expect("repository mutex poisoned");
        let mut jobs: Vec<Job> = guard.values().cloned().collect();
        jobs.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(jobs)
    }

    fn delete(&self, id: &JobId) -> Result<Job, RepositoryError> {
        let mut guard = self.jobs.lock().expect("repository mutex poisoned");
        guard.remove(id).ok_or(RepositoryError::NotFound)
    }

    fn modify<T, E, F>(&self, id: &JobId, mutate: F) -> Result<T, E>
    where
        F: FnOnce(&mut Job) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.jobs.lock().expect("repository mutex poisoned");
        let stored = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        let mut draft = stored.clone();
        let outcome = mutate(&mut draft)?;
        *stored = draft;
        Ok(outcome)
    }
}

/// Reads a single job object or an array of jobs from a JSON file. Array
/// entries that cannot be read as a job are skipped with a warning.
pub(crate) fn load_jobs(path: &Path) -> Result<Vec<Job>, AppError> {
    let reader = BufReader::new(File::open(path)?);
    let value: Value = serde_json::from_reader(reader)?;
    parse_jobs(value)
}

pub(crate) fn parse_jobs(value: Value) -> Result<Vec<Job>, AppError> {
    let entries = match value {
        Value::Array(entries) => entries,
        single => return Ok(vec![serde_json::from_value(single)?]),
    };

    let total = entries.len();
    let jobs: Vec<Job> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<Job>(entry) {
            Ok(job) => Some(job),
            Err(error) => {
                warn!(index, %error, "skipping unreadable job");
                None
            }
        })
        .collect();
    if jobs.len() < total {
        warn!(loaded = jobs.len(), skipped = total - jobs.len(), "job batch loaded with gaps");
    }
    Ok(jobs)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("failed to parse '{raw}' as RFC 3339 or YYYY-MM-DD"))
}
