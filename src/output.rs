use crate::error::ReportResult;
use crate::types::RevenueReport;
use std::io::Write;
use tabled::{settings::Style, Table, Tabled};

/// Write the report as two-space indented JSON followed by a newline.
pub fn write_report<W: Write>(mut out: W, report: &RevenueReport) -> ReportResult<()> {
    let s = serde_json::to_string_pretty(report)?;
    writeln!(out, "{}", s)?;
    out.flush()?;
    Ok(())
}

/// Markdown table for diagnostics; never written to stdout.
pub fn render_table<T>(rows: &[T]) -> String
where
    T: Tabled + Clone,
{
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(rows.to_vec()).with(Style::markdown()).to_string()
}
