use serde::{Deserialize, Serialize};

use super::super::domain::JobStatus;

pub const TOTAL_ROW_LABEL: &str = "TOTAL";

/// Counts and invoice values for one reporting window. Key names are consumed
/// verbatim by the summary table, including the doubled "of" and the double
/// space before "(SAR)".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodBlock {
    #[serde(rename = "Number of Compliant JO Invoices")]
    pub compliant_count: u64,
    #[serde(rename = "Number of of Non-Compliant JO Invoices")]
    pub non_compliant_count: u64,
    #[serde(rename = "Value of the Compliant JO Invoices (SAR)")]
    pub compliant_value: f64,
    #[serde(rename = "Value of Non-Compliant JO Invoices  (SAR)")]
    pub non_compliant_value: f64,
}

impl PeriodBlock {
    pub(crate) fn record(&mut self, status: JobStatus, amount: f64) {
        if status.is_compliant() {
            self.compliant_count += 1;
            self.compliant_value += amount;
        } else {
            self.non_compliant_count += 1;
            self.non_compliant_value += amount;
        }
    }

    pub(crate) fn absorb(&mut self, other: &PeriodBlock) {
        self.compliant_count += other.compliant_count;
        self.non_compliant_count += other.non_compliant_count;
        self.compliant_value += other.compliant_value;
        self.non_compliant_value += other.non_compliant_value;
    }

    pub fn job_count(&self) -> u64 {
        self.compliant_count + self.non_compliant_count
    }

    pub fn total_value(&self) -> f64 {
        self.compliant_value + self.non_compliant_value
    }

    pub fn has_jobs(&self) -> bool {
        self.job_count() > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "BU/Markets")]
    pub market: String,
    #[serde(rename = "Year-to-date")]
    pub year_to_date: PeriodBlock,
    #[serde(rename = "lastTwoWeeks")]
    pub last_two_weeks: PeriodBlock,
}

impl SummaryRow {
    pub(crate) fn empty(market: &str) -> Self {
        Self {
            market: market.to_string(),
            year_to_date: PeriodBlock::default(),
            last_two_weeks: PeriodBlock::default(),
        }
    }

    pub(crate) fn absorb(&mut self, other: &SummaryRow) {
        self.year_to_date.absorb(&other.year_to_date);
        self.last_two_weeks.absorb(&other.last_two_weeks);
    }

    /// Rows are only emitted when at least one window holds a job.
    pub fn has_jobs(&self) -> bool {
        self.year_to_date.has_jobs() || self.last_two_weeks.has_jobs()
    }

    pub fn is_total(&self) -> bool {
        self.market == TOTAL_ROW_LABEL
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub count: u64,
    pub amount: f64,
}

impl From<&PeriodBlock> for PeriodTotals {
    fn from(block: &PeriodBlock) -> Self {
        Self {
            count: block.job_count(),
            amount: block.total_value(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    pub ytd: PeriodTotals,
    #[serde(rename = "lastTwoWeeks")]
    pub last_two_weeks: PeriodTotals,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NoteTotal {
    #[serde(rename = "Total # of JOs")]
    pub total_jobs: u64,
    #[serde(rename = "Total amount (SAR)")]
    pub total_amount: f64,
}

/// Totals block printed under the summary table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NoteTotals {
    #[serde(rename = "Year-to-date")]
    pub year_to_date: NoteTotal,
    #[serde(rename = "lastTwoWeeks")]
    pub last_two_weeks: NoteTotal,
}

impl From<&SummaryTotals> for NoteTotals {
    fn from(totals: &SummaryTotals) -> Self {
        Self {
            year_to_date: NoteTotal {
                total_jobs: totals.ytd.count,
                total_amount: totals.ytd.amount,
            },
            last_two_weeks: NoteTotal {
                total_jobs: totals.last_two_weeks.count,
                total_amount: totals.last_two_weeks.amount,
            },
        }
    }
}
