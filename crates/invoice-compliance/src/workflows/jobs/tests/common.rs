use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::session::{Role, SessionRegistry, TokenTable};
use crate::workflows::jobs::domain::{AgencyId, Checklist, Document, DocumentKind, Job, JobId};
use crate::workflows::jobs::repository::{JobRepository, RepositoryError};
use crate::workflows::jobs::review::ReviewRecord;
use crate::workflows::jobs::service::{DocumentUpload, NewJob};
use crate::workflows::jobs::{job_router, JobComplianceService, JobStatus};

pub(super) const ADMIN_TOKEN: &str = "admin-token";
pub(super) const USER_TOKEN: &str = "user-token";

/// Reporting clock used across summary tests: 2025-08-20 12:00 UTC.
pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 20, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn days_before_now(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

pub(super) fn document(name: &str) -> Document {
    Document::new(
        format!("uploads/{name}"),
        Some(name.to_string()),
        Some("analyst".to_string()),
        now(),
    )
}

/// Checklist with the given number of documents per evaluated bucket.
pub(super) fn checklist(
    invoices: usize,
    quotations: usize,
    job_orders: usize,
    proofs: usize,
) -> Checklist {
    let mut checklist = Checklist::default();
    let counts = [
        (DocumentKind::AgencyInvoice, invoices),
        (DocumentKind::ApprovedQuotation, quotations),
        (DocumentKind::JobOrder, job_orders),
        (DocumentKind::PerformanceProof, proofs),
    ];
    for (kind, count) in counts {
        for index in 0..count {
            checklist.attach(kind, document(&format!("{}-{index}.pdf", kind.key())));
        }
    }
    checklist
}

pub(super) fn complete_checklist() -> Checklist {
    checklist(3, 2, 1, 1)
}

pub(super) fn reviewed_job(
    id: &str,
    market_bu: &str,
    status: JobStatus,
    amount: f64,
    created_at: DateTime<Utc>,
) -> Job {
    let mut job = Job::new(
        JobId(id.to_string()),
        AgencyId("AG-001".to_string()),
        format!("Campaign {id}"),
        "Admin",
        created_at,
    );
    job.status = status;
    job.review = Some(ReviewRecord {
        market_bu: Some(market_bu.to_string()),
        agency_invoice_total_amount: amount,
        ..ReviewRecord::default()
    });
    job
}

pub(super) fn new_job(agency: &str, title: &str) -> NewJob {
    NewJob {
        agency_id: AgencyId(agency.to_string()),
        title: title.to_string(),
        description: Some("Q3 flight".to_string()),
        start_date: None,
        end_date: None,
        created_by: None,
    }
}

pub(super) fn upload(name: &str) -> DocumentUpload {
    DocumentUpload {
        file_path: format!("uploads/{name}"),
        original_filename: Some(name.to_string()),
        uploaded_by: Some("analyst".to_string()),
        metadata: Default::default(),
    }
}

pub(super) fn build_service() -> (JobComplianceService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = JobComplianceService::new(repository.clone());
    (service, repository)
}

pub(super) fn sessions() -> Arc<SessionRegistry> {
    let tokens = TokenTable::default()
        .with_entry(ADMIN_TOKEN, "ops", Role::Admin)
        .with_entry(USER_TOKEN, "reviewer", Role::User);
    Arc::new(SessionRegistry::new(tokens))
}

/// Router with both configured tokens already logged in.
pub(super) fn logged_in_router(service: JobComplianceService<MemoryRepository>) -> axum::Router {
    let sessions = sessions();
    sessions.login(ADMIN_TOKEN, now()).expect("admin login");
    sessions.login(USER_TOKEN, now()).expect("user login");
    job_router(Arc::new(service), sessions)
}

pub(super) fn authorized(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("json body")))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) jobs: Arc<Mutex<HashMap<JobId, Job>>>,
}

impl JobRepository for MemoryRepository {
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
        if !guard.contains_key(&job.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(job.id.clone(), job);
        Ok(())
    }

    fn fetch(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        let guard = self.jobs.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_by_agency(&self, agency_id: &AgencyId) -> Result<Vec<Job>, RepositoryError> {
        let mut jobs: Vec<Job> = self
            .list_all()?
            .into_iter()
            .filter(|job| &job.agency_id == agency_id)
            .collect();
        jobs.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(jobs)
    }

    fn list_all(&self) -> Result<Vec<Job>, RepositoryError> {
        let guard = self.jobs.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
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

pub(super) struct UnavailableRepository;

impl JobRepository for UnavailableRepository {
    fn insert(&self, _job: Job) -> Result<Job, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _job: Job) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_by_agency(&self, _agency_id: &AgencyId) -> Result<Vec<Job>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_all(&self) -> Result<Vec<Job>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &JobId) -> Result<Job, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn modify<T, E, F>(&self, _id: &JobId, _mutate: F) -> Result<T, E>
    where
        F: FnOnce(&mut Job) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}
