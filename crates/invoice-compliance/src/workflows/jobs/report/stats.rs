use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use super::super::domain::{ChecklistPresence, Job, JobId, JobStatus};

/// Headline counters for the dashboard landing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_agencies: usize,
    pub total_invoices: usize,
    pub compliant_jobs: usize,
    pub non_compliant_jobs: usize,
}

impl DashboardStats {
    pub fn from_jobs(jobs: &[Job]) -> Self {
        let compliant_jobs = jobs.iter().filter(|job| job.status.is_compliant()).count();
        let total_agencies = jobs
            .iter()
            .map(|job| &job.agency_id)
            .collect::<BTreeSet<_>>()
            .len();

        Self {
            total_agencies,
            total_invoices: jobs.len(),
            compliant_jobs,
            non_compliant_jobs: jobs.len() - compliant_jobs,
        }
    }
}

/// One line of the detailed invoice review table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedReviewRow {
    pub job_id: JobId,
    pub title: String,
    pub status: JobStatus,
    pub market_bu: Option<String>,
    pub agency_invoice_number: Option<String>,
    pub date_invoice_sent_to_medpush: Option<DateTime<Utc>>,
    pub date_medpush_approved_invoice: Option<DateTime<Utc>>,
    pub agency_invoice_total_amount: f64,
    pub initial_review_outcome: Option<String>,
    pub final_review_outcome: Option<String>,
    pub documents: Vec<ChecklistPresence>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedReview {
    pub rows: Vec<DetailedReviewRow>,
    pub total_amount: f64,
}

impl DetailedReview {
    pub fn from_jobs(jobs: &[Job]) -> Self {
        let rows: Vec<DetailedReviewRow> = jobs.iter().map(DetailedReviewRow::from_job).collect();
        let total_amount = rows.iter().map(|row| row.agency_invoice_total_amount).sum();
        Self { rows, total_amount }
    }
}

impl DetailedReviewRow {
    fn from_job(job: &Job) -> Self {
        let review = job.review.as_ref();
        Self {
            job_id: job.id.clone(),
            title: job.title.clone(),
            status: job.status,
            market_bu: review.and_then(|review| review.market_bu.clone()),
            agency_invoice_number: review.and_then(|review| review.agency_invoice_number.clone()),
            date_invoice_sent_to_medpush: review
                .and_then(|review| review.date_invoice_sent_to_medpush),
            date_medpush_approved_invoice: review
                .and_then(|review| review.date_medpush_approved_invoice),
            agency_invoice_total_amount: job.invoice_total(),
            initial_review_outcome: review
                .and_then(|review| review.initial_review_outcome.clone()),
            final_review_outcome: review.and_then(|review| {
                review
                    .final_review_outcome
                    .as_ref()
                    .map(|outcome| outcome.label().to_string())
            }),
            documents: job.checklist.presence(),
        }
    }
}
