// Entry point: a single pass from `data.csv` to a JSON revenue summary.
//
// Locate -> load -> validate -> coerce -> aggregate -> report. The first
// three stages can stop the run; each failure class gets its own exit code
// so calling scripts can branch on the cause. Diagnostics go to stderr and
// stdout carries nothing but the finished report.
mod error;
mod loader;
mod output;
mod reports;
mod types;
mod util;

use error::ReportResult;
use std::io;
use std::process::ExitCode;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

fn run() -> ReportResult<()> {
    let path = loader::locate_data_file()?;
    let dataset = loader::load_dataset(&path)?;
    loader::validate(&dataset)?;

    let (records, coerce_report) = loader::coerce(dataset);
    info!(
        "Processing dataset... ({} rows loaded, {} blank and {} unparseable revenue values)",
        util::format_int(coerce_report.total_rows),
        util::format_int(coerce_report.blank_revenue),
        util::format_int(coerce_report.unparsed_revenue)
    );
    if tracing::enabled!(Level::DEBUG) {
        debug!("group breakdown:\n{}", output::render_table(&reports::group_preview(&records)));
    }

    let report = reports::generate_report(&records);
    output::write_report(io::stdout().lock(), &report)
}

fn main() -> ExitCode {
    // RUST_LOG=info (or debug) for diagnostics; they never touch stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
