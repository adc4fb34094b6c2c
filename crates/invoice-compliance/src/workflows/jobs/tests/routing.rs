use super::common::*;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::jobs::repository::JobRepository;
use crate::workflows::jobs::router::{dashboard_handler, JobApi};
use crate::workflows::jobs::{JobComplianceService, JobStatus};

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let (service, _) = build_service();
    let router = logged_in_router(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/dashboard/stats")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "missing bearer token");
}

#[tokio::test]
async fn tokens_must_log_in_before_use() {
    let (service, _) = build_service();
    let router = job_router_without_logins(service);

    let before = router
        .clone()
        .oneshot(authorized("GET", "/api/v1/dashboard/stats", USER_TOKEN, None))
        .await
        .expect("route executes");
    assert_eq!(before.status(), StatusCode::UNAUTHORIZED);

    let login = router
        .clone()
        .oneshot(authorized("POST", "/api/v1/auth/login", USER_TOKEN, None))
        .await
        .expect("route executes");
    assert_eq!(login.status(), StatusCode::OK);
    let session = read_json_body(login).await;
    assert_eq!(session["user"]["username"], "reviewer");
    assert_eq!(session["user"]["role"], "user");

    let after = router
        .clone()
        .oneshot(authorized("GET", "/api/v1/dashboard/stats", USER_TOKEN, None))
        .await
        .expect("route executes");
    assert_eq!(after.status(), StatusCode::OK);

    let logout = router
        .clone()
        .oneshot(authorized("POST", "/api/v1/auth/logout", USER_TOKEN, None))
        .await
        .expect("route executes");
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);

    let revoked = router
        .oneshot(authorized("GET", "/api/v1/dashboard/stats", USER_TOKEN, None))
        .await
        .expect("route executes");
    assert_eq!(revoked.status(), StatusCode::UNAUTHORIZED);
}

fn job_router_without_logins(service: JobComplianceService<MemoryRepository>) -> axum::Router {
    crate::workflows::jobs::job_router(Arc::new(service), sessions())
}

#[tokio::test]
async fn unknown_tokens_cannot_log_in() {
    let (service, _) = build_service();
    let response = job_router_without_logins(service)
        .oneshot(authorized("POST", "/api/v1/auth/login", "forged", None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_route_records_the_session_user() {
    let (service, _) = build_service();
    let router = logged_in_router(service);

    let response = router
        .oneshot(authorized(
            "POST",
            "/api/v1/jobs",
            USER_TOKEN,
            Some(json!({ "agency_id": "AG-5", "title": "Outdoor", "start_date": "2025-08-01" })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["created_by"], "reviewer");
    assert_eq!(payload["status"], "Not Compliant");
    assert_eq!(payload["checklist"]["agency_invoice"], json!([]));
}

#[tokio::test]
async fn create_route_rejects_blank_titles() {
    let (service, _) = build_service();
    let response = logged_in_router(service)
        .oneshot(authorized(
            "POST",
            "/api/v1/jobs",
            USER_TOKEN,
            Some(json!({ "agency_id": "AG-5", "title": " " })),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_document_kind_is_a_bad_request() {
    let (service, _) = build_service();
    let job = service.create(new_job("AG-1", "Launch"), now()).expect("created");
    let router = logged_in_router(service);

    let response = router
        .oneshot(authorized(
            "POST",
            &format!("/api/v1/jobs/{}/documents/screenshots", job.id),
            USER_TOKEN,
            Some(json!({ "file_path": "uploads/a.png" })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .expect("error message")
        .contains("invalid folder type"));
}

#[tokio::test]
async fn document_routes_attach_list_and_remove() {
    let (service, _) = build_service();
    let job = service.create(new_job("AG-1", "Launch"), now()).expect("created");
    let router = logged_in_router(service);
    let documents_uri = format!("/api/v1/jobs/{}/documents/job_order", job.id);

    let attached = router
        .clone()
        .oneshot(authorized(
            "POST",
            &documents_uri,
            USER_TOKEN,
            Some(json!({ "file_path": "uploads/jo.pdf", "original_filename": "JO 118.pdf" })),
        ))
        .await
        .expect("route executes");
    assert_eq!(attached.status(), StatusCode::CREATED);
    let payload = read_json_body(attached).await;
    assert_eq!(payload["status"], "Not Compliant");
    assert_eq!(payload["documents"][0]["uploaded_by"], "reviewer");

    let listed = router
        .clone()
        .oneshot(authorized("GET", &documents_uri, USER_TOKEN, None))
        .await
        .expect("route executes");
    assert_eq!(read_json_body(listed).await.as_array().map(Vec::len), Some(1));

    let missing = router
        .clone()
        .oneshot(authorized("DELETE", &format!("{documents_uri}/3"), USER_TOKEN, None))
        .await
        .expect("route executes");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let removed = router
        .oneshot(authorized("DELETE", &format!("{documents_uri}/0"), USER_TOKEN, None))
        .await
        .expect("route executes");
    assert_eq!(removed.status(), StatusCode::OK);
    assert_eq!(read_json_body(removed).await["file_path"], "uploads/jo.pdf");
}

#[tokio::test]
async fn evaluate_route_returns_verdict() {
    let (service, repository) = build_service();
    let job = service.create(new_job("AG-1", "Launch"), now()).expect("created");
    let mut stored = repository.fetch(&job.id).expect("fetch").expect("present");
    stored.checklist = complete_checklist();
    repository.update(stored).expect("seeded");

    let response = logged_in_router(service)
        .oneshot(authorized(
            "POST",
            &format!("/api/v1/jobs/{}/evaluate", job.id),
            USER_TOKEN,
            None,
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "Compliant");
    assert_eq!(payload["final_review_outcome"], "Approved");
    assert_eq!(
        payload["initial_review_outcome"],
        "All required documents are present and valid."
    );
}

#[tokio::test]
async fn update_route_edits_the_job_and_status() {
    let (service, repository) = build_service();
    let job = service.create(new_job("AG-1", "Launch"), now()).expect("created");

    let response = logged_in_router(service)
        .oneshot(authorized(
            "PUT",
            &format!("/api/v1/jobs/{}", job.id),
            USER_TOKEN,
            Some(json!({ "title": "Launch v2", "status": "Compliant" })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["title"], "Launch v2");
    assert_eq!(payload["status"], "Compliant");

    let stored = repository.fetch(&job.id).expect("fetch").expect("present");
    assert_eq!(stored.status, JobStatus::Compliant);
}

#[tokio::test]
async fn review_route_keeps_outcomes_entered_by_hand() {
    let (service, _) = build_service();
    let job = service.create(new_job("AG-1", "Launch"), now()).expect("created");

    let response = logged_in_router(service)
        .oneshot(authorized(
            "PUT",
            &format!("/api/v1/jobs/{}/review", job.id),
            USER_TOKEN,
            Some(json!({
                "market_bu": "APAC",
                "agency_invoice_total_amount": 900,
                "final_review_outcome": "Approved",
                "initial_review_outcome": "Cleared by finance"
            })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["review"]["final_review_outcome"], "Approved");
    assert_eq!(payload["review"]["initial_review_outcome"], "Cleared by finance");
    assert_eq!(payload["status"], "Not Compliant");
}

#[tokio::test]
async fn missing_jobs_are_not_found() {
    let (service, _) = build_service();
    let response = logged_in_router(service)
        .oneshot(authorized("GET", "/api/v1/jobs/job-missing", USER_TOKEN, None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_jobs_requires_admin() {
    let (service, repository) = build_service();
    let job = service.create(new_job("AG-1", "Launch"), now()).expect("created");
    let router = logged_in_router(service);
    let uri = format!("/api/v1/jobs/{}", job.id);

    let forbidden = router
        .clone()
        .oneshot(authorized("DELETE", &uri, USER_TOKEN, None))
        .await
        .expect("route executes");
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    assert!(repository.fetch(&job.id).expect("fetch").is_some());

    let deleted = router
        .oneshot(authorized("DELETE", &uri, ADMIN_TOKEN, None))
        .await
        .expect("route executes");
    assert_eq!(deleted.status(), StatusCode::OK);
    assert!(repository.fetch(&job.id).expect("fetch").is_none());
}

#[tokio::test]
async fn summary_route_returns_rows_totals_and_notes() {
    let (service, repository) = build_service();
    repository
        .insert(reviewed_job("job-s1", "A/E", JobStatus::Compliant, 1000.0, days_before_now(3)))
        .expect("insert");
    repository
        .insert(reviewed_job("job-s2", "A/E", JobStatus::NotCompliant, 500.0, days_before_now(3)))
        .expect("insert");

    let response = logged_in_router(service)
        .oneshot(authorized(
            "GET",
            "/api/v1/agencies/AG-001/summary?now=2025-08-20T12:00:00Z",
            USER_TOKEN,
            None,
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["rows"].as_array().map(Vec::len), Some(2));
    assert_eq!(payload["rows"][0]["BU/Markets"], "A/E");
    assert_eq!(
        payload["rows"][0]["lastTwoWeeks"]["Value of Non-Compliant JO Invoices  (SAR)"],
        500.0
    );
    assert_eq!(payload["totals"]["ytd"], json!({ "count": 2, "amount": 1500.0 }));
    assert_eq!(payload["noteTotals"]["lastTwoWeeks"]["Total # of JOs"], 2);
    assert_eq!(
        payload["lastTwoWeeksLabel"],
        "Last two weeks (06/08/2025- 20/08/2025)"
    );
}

#[tokio::test]
async fn summary_route_rejects_unparsable_now() {
    let (service, _) = build_service();
    let response = logged_in_router(service)
        .oneshot(authorized(
            "GET",
            "/api/v1/agencies/AG-001/summary?now=yesterday",
            USER_TOKEN,
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn csv_export_route_sets_content_type() {
    let (service, repository) = build_service();
    let mut job = reviewed_job("job-c1", "COE", JobStatus::Compliant, 42.0, now());
    job.checklist = complete_checklist();
    repository.insert(job).expect("insert");
    let router = logged_in_router(service);

    let response = router
        .clone()
        .oneshot(authorized("GET", "/api/v1/agencies/AG-001/report.csv", USER_TOKEN, None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/csv; charset=utf-8")
    );
    let body = read_text_body(response).await;
    assert!(body.starts_with("job_id,agency_id,title"));
    assert!(body.contains("job-c1"));

    let empty = router
        .oneshot(authorized("GET", "/api/v1/agencies/AG-404/report.csv", USER_TOKEN, None))
        .await
        .expect("route executes");
    assert_eq!(empty.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_handler_reports_repository_outages() {
    let sessions = sessions();
    sessions.login(USER_TOKEN, now()).expect("login");
    let api = Arc::new(JobApi {
        service: Arc::new(JobComplianceService::new(Arc::new(UnavailableRepository))),
        sessions,
    });

    let mut headers = axum::http::HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        format!("Bearer {USER_TOKEN}").parse().expect("header value"),
    );
    let response = dashboard_handler::<UnavailableRepository>(State(api), headers).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
