mod stats;
mod summary;
pub mod views;

pub use stats::{DashboardStats, DetailedReview, DetailedReviewRow};
pub use summary::{InvoiceSummary, ReportingWindows, SummaryAggregator};
pub use views::{NoteTotals, PeriodBlock, PeriodTotals, SummaryRow, SummaryTotals, TOTAL_ROW_LABEL};
