use serde::Serialize;

use super::domain::{Checklist, DocumentKind, Job, JobStatus};
use super::review::{ReviewOutcome, ReviewRecord};

/// Invoice tranches in billing order; a job needs all three invoices.
const INVOICE_TRANCHES: [&str; 3] = [
    "1. 20% agency invoice has not been attached",
    "2. 30% agency invoice has not been attached",
    "3. 50% agency invoice has not been attached",
];
const QUOTATIONS_MISSING: &str = "4. approved quotation documents have not been attached";
const QUOTATION_INCOMPLETE: &str = "5. one approved quotation document is missing";
const JOB_ORDER_MISSING: &str = "6. job order has not been attached";
const JOB_ORDER_DUPLICATED: &str = "7. multiple job orders found, only one is required";
const PERFORMANCE_PROOF_MISSING: &str =
    "8. proof of ads (performance proof) has not been attached";

const REQUIRED_QUOTATIONS: usize = 2;

pub const ALL_DOCUMENTS_PRESENT: &str = "All required documents are present and valid.";
pub const MISSING_DOCUMENTS_PREFIX: &str = "Missing or incorrect documents: ";

/// Missing checklist items in report order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistEvaluation {
    pub missing_items: Vec<String>,
    pub is_complete: bool,
}

/// Status and review outcome fields derived from a checklist evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceVerdict {
    pub status: JobStatus,
    pub final_review_outcome: ReviewOutcome,
    pub initial_review_outcome: String,
    pub missing_items: Vec<String>,
}

/// Decides whether a job's checklist satisfies the document requirements.
///
/// Timesheets and third-party documents are tracked on the checklist but do
/// not take part in the verdict.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplianceEvaluator;

impl ComplianceEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate_checklist(&self, checklist: &Checklist) -> ChecklistEvaluation {
        let mut missing_items: Vec<String> = Vec::new();

        let invoices = checklist.count(DocumentKind::AgencyInvoice);
        let attached_tranches = invoices.min(INVOICE_TRANCHES.len());
        missing_items.extend(
            INVOICE_TRANCHES[attached_tranches..]
                .iter()
                .map(|item| item.to_string()),
        );

        match checklist.count(DocumentKind::ApprovedQuotation) {
            0 => missing_items.push(QUOTATIONS_MISSING.to_string()),
            count if count < REQUIRED_QUOTATIONS => {
                missing_items.push(QUOTATION_INCOMPLETE.to_string())
            }
            _ => {}
        }

        match checklist.count(DocumentKind::JobOrder) {
            0 => missing_items.push(JOB_ORDER_MISSING.to_string()),
            1 => {}
            _ => missing_items.push(JOB_ORDER_DUPLICATED.to_string()),
        }

        if checklist.count(DocumentKind::PerformanceProof) == 0 {
            missing_items.push(PERFORMANCE_PROOF_MISSING.to_string());
        }

        let is_complete = missing_items.is_empty();
        ChecklistEvaluation {
            missing_items,
            is_complete,
        }
    }

    pub fn derive_status(&self, missing_items: &[String]) -> ComplianceVerdict {
        if missing_items.is_empty() {
            ComplianceVerdict {
                status: JobStatus::Compliant,
                final_review_outcome: ReviewOutcome::Approved,
                initial_review_outcome: ALL_DOCUMENTS_PRESENT.to_string(),
                missing_items: Vec::new(),
            }
        } else {
            ComplianceVerdict {
                status: JobStatus::NotCompliant,
                final_review_outcome: ReviewOutcome::NotApproved,
                initial_review_outcome: format!(
                    "{MISSING_DOCUMENTS_PREFIX}{}",
                    missing_items.join("; ")
                ),
                missing_items: missing_items.to_vec(),
            }
        }
    }

    pub fn evaluate(&self, checklist: &Checklist) -> ComplianceVerdict {
        let evaluation = self.evaluate_checklist(checklist);
        self.derive_status(&evaluation.missing_items)
    }

    /// Evaluates the job's checklist and writes the verdict onto the job,
    /// creating an empty review record when none exists yet.
    pub fn apply(&self, job: &mut Job) -> ComplianceVerdict {
        let verdict = self.evaluate(&job.checklist);
        job.status = verdict.status;

        let review = job.review.get_or_insert_with(ReviewRecord::default);
        review.initial_review_outcome = Some(verdict.initial_review_outcome.clone());
        review.final_review_outcome = Some(verdict.final_review_outcome.clone());

        verdict
    }

    /// Fills the outcome fields a reviewer left blank from the checklist
    /// verdict. Outcomes entered by hand are kept as they are.
    pub fn complete_review(
        &self,
        checklist: &Checklist,
        review: &mut ReviewRecord,
    ) -> ComplianceVerdict {
        let verdict = self.evaluate(checklist);
        if review.initial_review_outcome.is_none() {
            review.initial_review_outcome = Some(verdict.initial_review_outcome.clone());
        }
        if review.final_review_outcome.is_none() {
            review.final_review_outcome = Some(verdict.final_review_outcome.clone());
        }
        verdict
    }
}
