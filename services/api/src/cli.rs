use crate::report::{run_evaluate, run_export, run_summary, EvaluateArgs, ExportArgs, SummaryArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use invoice_compliance::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Invoice Compliance",
    about = "Evaluate job-order invoice compliance and report validation summaries",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate the checklist of one or more jobs read from JSON
    Evaluate(EvaluateArgs),
    /// Print the per-business-unit validation summary for a set of jobs
    Summary(SummaryArgs),
    /// Export jobs with their review data and checklist filenames as CSV
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Preload the in-memory repository from a JSON array of jobs
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluate(args),
        Command::Summary(args) => run_summary(args),
        Command::Export(args) => run_export(args),
    }
}
