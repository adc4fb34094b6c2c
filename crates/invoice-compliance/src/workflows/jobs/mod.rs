//! Job-order invoice compliance: checklist tracking, compliance verdicts, and
//! the validation summary reported per business unit.

pub mod compliance;
pub mod domain;
pub mod export;
mod parse;
pub mod report;
pub mod repository;
pub mod review;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use compliance::{ChecklistEvaluation, ComplianceEvaluator, ComplianceVerdict};
pub use domain::{
    AgencyId, Checklist, ChecklistError, ChecklistPresence, Document, DocumentKind, Job, JobId,
    JobStatus,
};
pub use export::{write_jobs_csv, ExportError};
pub use report::{
    DashboardStats, DetailedReview, DetailedReviewRow, InvoiceSummary, NoteTotals, PeriodBlock,
    PeriodTotals, ReportingWindows, SummaryAggregator, SummaryRow, SummaryTotals,
};
pub use repository::{JobRepository, JobStatusView, RepositoryError};
pub use review::{BusinessUnit, ReviewOutcome, ReviewRecord};
pub use router::{job_router, JobApi};
pub use service::{DocumentUpload, JobComplianceService, JobServiceError, JobUpdate, NewJob};
