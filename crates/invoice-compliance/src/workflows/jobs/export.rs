use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

use super::domain::{DocumentKind, Job};
use super::review::ReviewRecord;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no jobs to export")]
    NoJobs,
    #[error("failed to write CSV report: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV report: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat CSV projection of a job, its review, and its checklist filenames.
#[derive(Debug, Serialize)]
struct JobCsvRow<'a> {
    job_id: &'a str,
    agency_id: &'a str,
    title: &'a str,
    description: Option<&'a str>,
    start_date: Option<String>,
    end_date: Option<String>,
    status: &'static str,
    created_by: &'a str,
    created_at: Option<String>,
    updated_at: Option<String>,
    market_bu: Option<&'a str>,
    agency_invoice_number: Option<&'a str>,
    po_number: Option<&'a str>,
    period_month: Option<&'a str>,
    date_invoice_sent_to_medpush: Option<String>,
    date_medpush_shared_feedback: Option<String>,
    date_agency_responded_to_feedback: Option<String>,
    date_medpush_approved_invoice: Option<String>,
    medium: Option<&'a str>,
    campaign_name: Option<&'a str>,
    net_media_cost: Option<f64>,
    agency_fee: Option<f64>,
    taxes: Option<f64>,
    other_third_party_cost: Option<f64>,
    agency_invoice_total_amount: Option<f64>,
    media_plan_total_amount: Option<f64>,
    po_amount_with_af: Option<f64>,
    initial_review_outcome: Option<&'a str>,
    agency_feedback_action: Option<&'a str>,
    final_review_outcome: Option<&'a str>,
    status_of_received_invoices: Option<&'a str>,
    month_medpush_received_invoice: Option<&'a str>,
    days_medpush_to_review_and_share_feedback: Option<i64>,
    days_agency_to_revert_to_medpush: Option<i64>,
    days_medpush_to_approve_after_revision: Option<i64>,
    raw_ai_invoice_total_amount: Option<String>,
    raw_ai_po_number: Option<String>,
    raw_ai_po_amount: Option<String>,
    checklist_agency_invoice: String,
    checklist_approved_quotation: String,
    checklist_job_order: String,
    checklist_timesheet: String,
    checklist_third_party: String,
    checklist_performance_proof: String,
}

fn iso(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|at| at.to_rfc3339())
}

fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

impl<'a> JobCsvRow<'a> {
    fn from_job(job: &'a Job) -> Self {
        let review = job.review.as_ref();
        let amount = |pick: fn(&ReviewRecord) -> f64| review.map(pick);
        let filenames = |kind: DocumentKind| job.checklist.filenames(kind).join(", ");
        let raw_invoice_summary = review
            .and_then(|review| review.raw_ai_invoice_output.as_ref())
            .and_then(|output| output.get("summary"));
        let raw_po = review.and_then(|review| review.raw_ai_po_output.as_ref());

        Self {
            job_id: &job.id.0,
            agency_id: &job.agency_id.0,
            title: &job.title,
            description: job.description.as_deref(),
            start_date: iso(job.start_date),
            end_date: iso(job.end_date),
            status: job.status.label(),
            created_by: &job.created_by,
            created_at: iso(job.created_at),
            updated_at: iso(job.updated_at),
            market_bu: review.and_then(|review| review.market_bu.as_deref()),
            agency_invoice_number: review.and_then(|review| review.agency_invoice_number.as_deref()),
            po_number: review.and_then(|review| review.po_number.as_deref()),
            period_month: review.and_then(|review| review.period_month.as_deref()),
            date_invoice_sent_to_medpush: iso(
                review.and_then(|review| review.date_invoice_sent_to_medpush),
            ),
            date_medpush_shared_feedback: iso(
                review.and_then(|review| review.date_medpush_shared_feedback),
            ),
            date_agency_responded_to_feedback: iso(
                review.and_then(|review| review.date_agency_responded_to_feedback),
            ),
            date_medpush_approved_invoice: iso(
                review.and_then(|review| review.date_medpush_approved_invoice),
            ),
            medium: review.and_then(|review| review.medium.as_deref()),
            campaign_name: review.and_then(|review| review.campaign_name.as_deref()),
            net_media_cost: amount(|review| review.net_media_cost),
            agency_fee: amount(|review| review.agency_fee),
            taxes: amount(|review| review.taxes),
            other_third_party_cost: amount(|review| review.other_third_party_cost),
            agency_invoice_total_amount: amount(|review| review.agency_invoice_total_amount),
            media_plan_total_amount: amount(|review| review.media_plan_total_amount),
            po_amount_with_af: amount(|review| review.po_amount_with_af),
            initial_review_outcome: review
                .and_then(|review| review.initial_review_outcome.as_deref()),
            agency_feedback_action: review
                .and_then(|review| review.agency_feedback_action.as_deref()),
            final_review_outcome: review.and_then(|review| {
                review
                    .final_review_outcome
                    .as_ref()
                    .map(|outcome| outcome.label())
            }),
            status_of_received_invoices: review
                .and_then(|review| review.status_of_received_invoices.as_deref()),
            month_medpush_received_invoice: review
                .and_then(|review| review.month_medpush_received_invoice.as_deref()),
            days_medpush_to_review_and_share_feedback: review
                .and_then(|review| review.days_medpush_to_review_and_share_feedback),
            days_agency_to_revert_to_medpush: review
                .and_then(|review| review.days_agency_to_revert_to_medpush),
            days_medpush_to_approve_after_revision: review
                .and_then(|review| review.days_medpush_to_approve_after_revision),
            raw_ai_invoice_total_amount: scalar(
                raw_invoice_summary.and_then(|summary| summary.get("total_amount")),
            ),
            raw_ai_po_number: scalar(raw_po.and_then(|output| output.get("po_number"))),
            raw_ai_po_amount: scalar(raw_po.and_then(|output| output.get("po_amount"))),
            checklist_agency_invoice: filenames(DocumentKind::AgencyInvoice),
            checklist_approved_quotation: filenames(DocumentKind::ApprovedQuotation),
            checklist_job_order: filenames(DocumentKind::JobOrder),
            checklist_timesheet: filenames(DocumentKind::Timesheet),
            checklist_third_party: filenames(DocumentKind::ThirdParty),
            checklist_performance_proof: filenames(DocumentKind::PerformanceProof),
        }
    }
}

/// Writes one CSV line per job (plus header) and returns the number of jobs written.
pub fn write_jobs_csv<W: Write>(jobs: &[Job], writer: W) -> Result<usize, ExportError> {
    if jobs.is_empty() {
        return Err(ExportError::NoJobs);
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    for job in jobs {
        csv_writer.serialize(JobCsvRow::from_job(job))?;
    }
    csv_writer.flush()?;

    Ok(jobs.len())
}
