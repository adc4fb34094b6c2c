use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use super::super::domain::Job;
use super::super::review::BusinessUnit;
use super::views::{NoteTotals, SummaryRow, SummaryTotals, TOTAL_ROW_LABEL};

const LAST_TWO_WEEKS_DAYS: i64 = 14;

/// The two reporting windows, both closed at `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportingWindows {
    pub now: DateTime<Utc>,
    pub year_start: DateTime<Utc>,
    pub two_weeks_ago: DateTime<Utc>,
}

impl ReportingWindows {
    pub fn ending_at(now: DateTime<Utc>) -> Self {
        let year_start = NaiveDate::from_ymd_opt(now.year(), 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .unwrap_or(now);

        Self {
            now,
            year_start,
            two_weeks_ago: now - Duration::days(LAST_TWO_WEEKS_DAYS),
        }
    }

    pub fn in_year_to_date(&self, at: DateTime<Utc>) -> bool {
        at >= self.year_start && at <= self.now
    }

    pub fn in_last_two_weeks(&self, at: DateTime<Utc>) -> bool {
        at >= self.two_weeks_ago && at <= self.now
    }

    /// Header label for the last-two-weeks columns, e.g.
    /// `Last two weeks (13/08/2025- 20/08/2025)`.
    pub fn last_two_weeks_label(&self) -> String {
        format!(
            "Last two weeks ({}- {})",
            self.two_weeks_ago.format("%d/%m/%Y"),
            self.now.format("%d/%m/%Y")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceSummary {
    pub rows: Vec<SummaryRow>,
    pub totals: SummaryTotals,
    #[serde(skip)]
    pub windows: ReportingWindows,
}

impl InvoiceSummary {
    pub fn note_totals(&self) -> NoteTotals {
        NoteTotals::from(&self.totals)
    }

    pub fn last_two_weeks_label(&self) -> String {
        self.windows.last_two_weeks_label()
    }

    pub fn total_row(&self) -> Option<&SummaryRow> {
        self.rows.iter().find(|row| row.is_total())
    }

    pub fn row(&self, unit: BusinessUnit) -> Option<&SummaryRow> {
        self.rows.iter().find(|row| row.market == unit.code())
    }
}

/// Rolls reviewed jobs up per business unit across the year-to-date and
/// last-two-weeks windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryAggregator;

impl SummaryAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(&self, jobs: &[Job], now: DateTime<Utc>) -> InvoiceSummary {
        let windows = ReportingWindows::ending_at(now);
        let mut rows = Vec::new();
        let mut grand_total = SummaryRow::empty(TOTAL_ROW_LABEL);

        for unit in BusinessUnit::ordered() {
            let mut row = SummaryRow::empty(unit.code());

            for job in jobs.iter().filter(|job| job.business_unit() == Some(unit)) {
                let Some(created_at) = job.created_at else {
                    debug!(job_id = %job.id, "job has no readable creation timestamp; outside every window");
                    continue;
                };

                let amount = job.invoice_total();
                if windows.in_year_to_date(created_at) {
                    row.year_to_date.record(job.status, amount);
                }
                if windows.in_last_two_weeks(created_at) {
                    row.last_two_weeks.record(job.status, amount);
                }
            }

            grand_total.absorb(&row);
            if row.has_jobs() {
                rows.push(row);
            }
        }

        let uncategorized = jobs
            .iter()
            .filter(|job| job.review.is_some() && job.business_unit().is_none())
            .count();
        if uncategorized > 0 {
            debug!(
                uncategorized,
                "reviewed jobs without a known business unit left out of the summary"
            );
        }

        let totals = SummaryTotals {
            ytd: (&grand_total.year_to_date).into(),
            last_two_weeks: (&grand_total.last_two_weeks).into(),
        };

        if grand_total.has_jobs() {
            rows.push(grand_total);
        }

        InvoiceSummary {
            rows,
            totals,
            windows,
        }
    }
}
