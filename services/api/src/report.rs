use crate::infra::{load_jobs, InMemoryJobRepository};
use chrono::{DateTime, Utc};
use clap::Args;
use invoice_compliance::error::AppError;
use invoice_compliance::workflows::jobs::{
    write_jobs_csv, AgencyId, ComplianceEvaluator, InvoiceSummary, Job, JobComplianceService,
    PeriodBlock,
};
use serde_json::json;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Path to a job JSON document (single object or array)
    #[arg(long)]
    pub(crate) job: PathBuf,
    /// Print the verdicts as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct SummaryArgs {
    /// Path to a JSON array of jobs
    #[arg(long)]
    pub(crate) jobs: PathBuf,
    /// Reporting time (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Restrict the summary to one agency
    #[arg(long)]
    pub(crate) agency: Option<String>,
    /// Print the summary as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Path to a JSON array of jobs
    #[arg(long)]
    pub(crate) jobs: PathBuf,
    /// Destination CSV file (defaults to stdout)
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
    /// Restrict the export to one agency
    #[arg(long)]
    pub(crate) agency: Option<String>,
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let jobs = load_jobs(&args.job)?;
    let evaluator = ComplianceEvaluator::new();

    if args.json {
        let verdicts: Vec<_> = jobs
            .iter()
            .map(|job| {
                json!({
                    "job_id": job.id,
                    "title": job.title,
                    "verdict": evaluator.evaluate(&job.checklist),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&verdicts)?);
        return Ok(());
    }

    for job in &jobs {
        render_verdict(&evaluator, job);
    }
    Ok(())
}

fn render_verdict(evaluator: &ComplianceEvaluator, job: &Job) {
    let verdict = evaluator.evaluate(&job.checklist);
    println!("Job {} ({})", job.id, job.title);
    println!(
        "- Status: {} | Final review outcome: {}",
        verdict.status, verdict.final_review_outcome
    );

    println!("- Checklist");
    for presence in job.checklist.presence() {
        let marker = if presence.present { "x" } else { " " };
        println!("  [{marker}] {} ({})", presence.label, presence.count);
    }

    if verdict.missing_items.is_empty() {
        println!("- {}", verdict.initial_review_outcome);
    } else {
        println!("- Missing items");
        for item in &verdict.missing_items {
            println!("  {item}");
        }
    }
}

pub(crate) fn run_summary(args: SummaryArgs) -> Result<(), AppError> {
    let now = args.now.unwrap_or_else(Utc::now);
    let service = service_for(load_jobs(&args.jobs)?)?;
    let agency = args.agency.map(AgencyId);
    let summary = service.summary(agency.as_ref(), now)?;

    if args.json {
        let payload = json!({
            "rows": summary.rows,
            "totals": summary.totals,
            "noteTotals": summary.note_totals(),
            "lastTwoWeeksLabel": summary.last_two_weeks_label(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        render_summary(&summary);
    }
    Ok(())
}

pub(crate) fn render_summary(summary: &InvoiceSummary) {
    println!("Invoice validation summary");
    println!(
        "Reporting window: year-to-date from {} | {}",
        summary.windows.year_start.format("%d/%m/%Y"),
        summary.last_two_weeks_label()
    );

    if summary.rows.is_empty() {
        println!("\nNo reviewed jobs fall inside the reporting windows.");
    } else {
        println!(
            "\n{:<10} | {:>44} | {:>44}",
            "BU/Markets", "Year-to-date", "Last two weeks"
        );
        for row in &summary.rows {
            println!(
                "{:<10} | {} | {}",
                row.market,
                format_block(&row.year_to_date),
                format_block(&row.last_two_weeks)
            );
        }
    }

    let notes = summary.note_totals();
    println!(
        "\nTotal # of JOs: {} year-to-date, {} last two weeks",
        notes.year_to_date.total_jobs, notes.last_two_weeks.total_jobs
    );
    println!(
        "Total amount (SAR): {:.2} year-to-date, {:.2} last two weeks",
        notes.year_to_date.total_amount, notes.last_two_weeks.total_amount
    );
}

fn format_block(block: &PeriodBlock) -> String {
    format!(
        "{:>3} ok {:>14.2} | {:>3} nok {:>14.2}",
        block.compliant_count,
        block.compliant_value,
        block.non_compliant_count,
        block.non_compliant_value
    )
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let jobs = load_jobs(&args.jobs)?;
    let jobs: Vec<Job> = match args.agency.map(AgencyId) {
        Some(agency) => jobs
            .into_iter()
            .filter(|job| job.agency_id == agency)
            .collect(),
        None => jobs,
    };

    let written = match &args.out {
        Some(path) => write_jobs_csv(&jobs, BufWriter::new(File::create(path)?))?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            let written = write_jobs_csv(&jobs, &mut handle)?;
            handle.flush()?;
            written
        }
    };

    if let Some(path) = &args.out {
        info!(rows = written, path = %path.display(), "CSV export written");
        println!("Exported {written} jobs to {}", path.display());
    }
    Ok(())
}

fn service_for(jobs: Vec<Job>) -> Result<JobComplianceService<InMemoryJobRepository>, AppError> {
    let repository = InMemoryJobRepository::seeded(jobs).map_err(|err| AppError::Jobs(err.into()))?;
    Ok(JobComplianceService::new(Arc::new(repository)))
}
