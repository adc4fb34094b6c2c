use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{AgencyId, ChecklistError, DocumentKind, JobId};
use super::export::ExportError;
use super::parse::parse_timestamp;
use super::repository::{JobRepository, JobStatusView, RepositoryError};
use super::review::ReviewRecord;
use super::service::{DocumentUpload, JobComplianceService, JobServiceError, JobUpdate, NewJob};
use crate::session::{Role, Session, SessionError, SessionRegistry};

/// Shared handler state: the job service plus the registry that resolves callers.
pub struct JobApi<R> {
    pub service: Arc<JobComplianceService<R>>,
    pub sessions: Arc<SessionRegistry>,
}

/// Router builder exposing job, checklist, and reporting endpoints.
pub fn job_router<R>(
    service: Arc<JobComplianceService<R>>,
    sessions: Arc<SessionRegistry>,
) -> Router
where
    R: JobRepository + 'static,
{
    let state = Arc::new(JobApi { service, sessions });

    Router::new()
        .route("/api/v1/auth/login", post(login_handler::<R>))
        .route("/api/v1/auth/logout", post(logout_handler::<R>))
        .route("/api/v1/jobs", post(create_handler::<R>))
        .route(
            "/api/v1/jobs/:job_id",
            get(job_handler::<R>)
                .put(update_job_handler::<R>)
                .delete(delete_handler::<R>),
        )
        .route(
            "/api/v1/jobs/:job_id/documents/:kind",
            get(documents_handler::<R>).post(attach_handler::<R>),
        )
        .route(
            "/api/v1/jobs/:job_id/documents/:kind/:index",
            delete(remove_document_handler::<R>),
        )
        .route("/api/v1/jobs/:job_id/evaluate", post(evaluate_handler::<R>))
        .route("/api/v1/jobs/:job_id/review", put(review_handler::<R>))
        .route(
            "/api/v1/agencies/:agency_id/jobs",
            get(agency_jobs_handler::<R>),
        )
        .route(
            "/api/v1/agencies/:agency_id/summary",
            get(summary_handler::<R>),
        )
        .route(
            "/api/v1/agencies/:agency_id/detailed-review",
            get(detailed_review_handler::<R>),
        )
        .route(
            "/api/v1/agencies/:agency_id/report.csv",
            get(export_handler::<R>),
        )
        .route("/api/v1/dashboard/stats", get(dashboard_handler::<R>))
        .with_state(state)
}

type ApiState<R> = State<Arc<JobApi<R>>>;

fn bearer_token(headers: &HeaderMap) -> Result<&str, SessionError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(SessionError::MissingToken)
}

fn authenticate<R>(api: &JobApi<R>, headers: &HeaderMap) -> Result<Session, Response> {
    bearer_token(headers)
        .and_then(|token| api.sessions.resolve(token))
        .map_err(session_error_response)
}

fn session_error_response(error: SessionError) -> Response {
    let status = match error {
        SessionError::MissingToken | SessionError::InvalidToken => StatusCode::UNAUTHORIZED,
        SessionError::Forbidden { .. } => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn service_error_response(error: JobServiceError) -> Response {
    let status = match &error {
        JobServiceError::InvalidJob(_) => StatusCode::UNPROCESSABLE_ENTITY,
        JobServiceError::Checklist(ChecklistError::UnknownKind(_)) => StatusCode::BAD_REQUEST,
        JobServiceError::Checklist(ChecklistError::DocumentNotFound { .. }) => {
            StatusCode::NOT_FOUND
        }
        JobServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        JobServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        JobServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        JobServiceError::Export(ExportError::NoJobs) => StatusCode::NOT_FOUND,
        JobServiceError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn parse_kind(raw: &str) -> Result<DocumentKind, Response> {
    raw.parse::<DocumentKind>()
        .map_err(|error| service_error_response(error.into()))
}

pub(crate) async fn login_handler<R>(State(api): ApiState<R>, headers: HeaderMap) -> Response
where
    R: JobRepository + 'static,
{
    let login = bearer_token(&headers).and_then(|token| api.sessions.login(token, Utc::now()));
    match login {
        Ok(session) => {
            tracing::info!(username = %session.user.username, role = %session.user.role, "session started");
            (StatusCode::OK, axum::Json(session)).into_response()
        }
        Err(error) => session_error_response(error),
    }
}

pub(crate) async fn logout_handler<R>(State(api): ApiState<R>, headers: HeaderMap) -> Response
where
    R: JobRepository + 'static,
{
    match bearer_token(&headers).and_then(|token| api.sessions.logout(token)) {
        Ok(session) => {
            tracing::info!(username = %session.user.username, "session ended");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(error) => session_error_response(error),
    }
}

pub(crate) async fn create_handler<R>(
    State(api): ApiState<R>,
    headers: HeaderMap,
    axum::Json(new_job): axum::Json<NewJob>,
) -> Response
where
    R: JobRepository + 'static,
{
    let session = match authenticate(&api, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let new_job = NewJob {
        created_by: new_job.created_by.or(Some(session.user.username)),
        ..new_job
    };
    match api.service.create(new_job, Utc::now()) {
        Ok(job) => (StatusCode::CREATED, axum::Json(job)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn job_handler<R>(
    State(api): ApiState<R>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Response
where
    R: JobRepository + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }

    match api.service.get(&JobId(job_id)) {
        Ok(job) => {
            let presence = job.checklist.presence();
            let payload = json!({
                "job": job,
                "documents": presence,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn update_job_handler<R>(
    State(api): ApiState<R>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    axum::Json(update): axum::Json<JobUpdate>,
) -> Response
where
    R: JobRepository + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }

    match api.service.update_job(&JobId(job_id), update, Utc::now()) {
        Ok(job) => (StatusCode::OK, axum::Json(job)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn delete_handler<R>(
    State(api): ApiState<R>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Response
where
    R: JobRepository + 'static,
{
    let session = match authenticate(&api, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };
    if let Err(error) = session.require(Role::Admin) {
        tracing::warn!(username = %session.user.username, job_id = %job_id, "job deletion refused");
        return session_error_response(error);
    }

    match api.service.delete(&JobId(job_id)) {
        Ok(job) => {
            let payload = json!({
                "deleted": job.id,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn documents_handler<R>(
    State(api): ApiState<R>,
    headers: HeaderMap,
    Path((job_id, kind)): Path<(String, String)>,
) -> Response
where
    R: JobRepository + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    match api.service.documents(&JobId(job_id), kind) {
        Ok(documents) => (StatusCode::OK, axum::Json(documents)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn attach_handler<R>(
    State(api): ApiState<R>,
    headers: HeaderMap,
    Path((job_id, kind)): Path<(String, String)>,
    axum::Json(upload): axum::Json<DocumentUpload>,
) -> Response
where
    R: JobRepository + 'static,
{
    let session = match authenticate(&api, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    let upload = DocumentUpload {
        uploaded_by: upload.uploaded_by.or(Some(session.user.username)),
        ..upload
    };
    match api
        .service
        .attach_document(&JobId(job_id), kind, upload, Utc::now())
    {
        Ok(job) => {
            let payload = json!({
                "status": job.status,
                "documents": job.checklist.documents(kind),
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn remove_document_handler<R>(
    State(api): ApiState<R>,
    headers: HeaderMap,
    Path((job_id, kind, index)): Path<(String, String, usize)>,
) -> Response
where
    R: JobRepository + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    match api
        .service
        .remove_document(&JobId(job_id), kind, index, Utc::now())
    {
        Ok(document) => (StatusCode::OK, axum::Json(document)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn evaluate_handler<R>(
    State(api): ApiState<R>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Response
where
    R: JobRepository + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }

    match api.service.evaluate(&JobId(job_id), Utc::now()) {
        Ok(verdict) => (StatusCode::OK, axum::Json(verdict)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn review_handler<R>(
    State(api): ApiState<R>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    axum::Json(review): axum::Json<ReviewRecord>,
) -> Response
where
    R: JobRepository + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }

    match api.service.update_review(&JobId(job_id), review, Utc::now()) {
        Ok(job) => (StatusCode::OK, axum::Json(job)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn agency_jobs_handler<R>(
    State(api): ApiState<R>,
    headers: HeaderMap,
    Path(agency_id): Path<String>,
) -> Response
where
    R: JobRepository + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }

    match api.service.jobs_for_agency(&AgencyId(agency_id)) {
        Ok(jobs) => {
            let views: Vec<JobStatusView> = jobs.iter().map(JobStatusView::from).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => service_error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryQuery {
    now: Option<String>,
}

pub(crate) async fn summary_handler<R>(
    State(api): ApiState<R>,
    headers: HeaderMap,
    Path(agency_id): Path<String>,
    Query(query): Query<SummaryQuery>,
) -> Response
where
    R: JobRepository + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }

    let now = match query.now.as_deref() {
        None => Utc::now(),
        Some(raw) => match parse_timestamp(raw) {
            Some(now) => now,
            None => {
                let payload = json!({
                    "error": format!("'now' must be an ISO-8601 timestamp, got '{raw}'"),
                });
                return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
            }
        },
    };

    match api.service.summary(Some(&AgencyId(agency_id)), now) {
        Ok(summary) => {
            let payload = json!({
                "rows": summary.rows,
                "totals": summary.totals,
                "noteTotals": summary.note_totals(),
                "lastTwoWeeksLabel": summary.last_two_weeks_label(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn detailed_review_handler<R>(
    State(api): ApiState<R>,
    headers: HeaderMap,
    Path(agency_id): Path<String>,
) -> Response
where
    R: JobRepository + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }

    match api.service.detailed_review(&AgencyId(agency_id)) {
        Ok(review) => (StatusCode::OK, axum::Json(review)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn export_handler<R>(
    State(api): ApiState<R>,
    headers: HeaderMap,
    Path(agency_id): Path<String>,
) -> Response
where
    R: JobRepository + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }

    let mut buffer = Vec::new();
    let agency_id = AgencyId(agency_id);
    match api.service.export_csv(Some(&agency_id), &mut buffer) {
        Ok(_) => {
            let disposition = format!("attachment; filename=\"jobs_{agency_id}.csv\"");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                buffer,
            )
                .into_response()
        }
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn dashboard_handler<R>(State(api): ApiState<R>, headers: HeaderMap) -> Response
where
    R: JobRepository + 'static,
{
    if let Err(response) = authenticate(&api, &headers) {
        return response;
    }

    match api.service.dashboard() {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => service_error_response(error),
    }
}
