//! Output formatters for audit reports.

pub mod json;
pub mod plain;

use crate::audit::runner::AuditReport;
use crate::audit::types::{AuditResult, Severity};
use crate::error::Result;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain text output.
    #[default]
    Plain,
    /// JSON output.
    Json,
}

/// Results at or above `min_severity`, sorted by namespace, kind and name.
pub fn visible_results(report: &AuditReport, min_severity: Severity) -> Vec<AuditResult> {
    let mut results: Vec<AuditResult> = report
        .results
        .iter()
        .cloned()
        .filter_map(|mut result| {
            result.retain_at_least(min_severity);
            result.has_occurrences().then_some(result)
        })
        .collect();
    results.sort_by(AuditResult::report_order);
    results
}

/// Whether any error-severity finding survives the filter.
pub fn has_errors(results: &[AuditResult]) -> bool {
    results
        .iter()
        .any(|r| r.max_severity() == Some(Severity::Error))
}

/// Format a report to a string.
pub fn format_report_to_string(
    report: &AuditReport,
    format: OutputFormat,
    min_severity: Severity,
) -> Result<String> {
    let results = visible_results(report, min_severity);
    match format {
        OutputFormat::Plain => Ok(plain::format(&results, &report.summary)),
        OutputFormat::Json => Ok(json::format(&results, &report.summary)?),
    }
}

/// Format and print a report.
pub fn format_report(
    report: &AuditReport,
    format: OutputFormat,
    min_severity: Severity,
) -> Result<()> {
    print!("{}", format_report_to_string(report, format, min_severity)?);
    Ok(())
}
