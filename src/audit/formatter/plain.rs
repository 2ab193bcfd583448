//! Plain text formatter.

use crate::audit::runner::AuditSummary;
use crate::audit::types::{AuditResult, Severity};
use colored::Colorize;

fn severity_label(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Error => "ERROR".bright_red().bold(),
        Severity::Warning => "WARN".yellow().bold(),
        Severity::Info => "INFO".bright_blue().bold(),
    }
}

/// Format results as plain text, one line per occurrence.
pub fn format(results: &[AuditResult], summary: &AuditSummary) -> String {
    let mut output = String::new();
    let mut count = 0;

    for result in results {
        for occurrence in &result.occurrences {
            count += 1;
            let subject = match &occurrence.container {
                Some(container) => format!("{} (container {})", result.object_identifier(), container),
                None => result.object_identifier(),
            };
            output.push_str(&format!(
                "[{}] {} {}: {} ({})\n",
                severity_label(occurrence.severity),
                result.kube_type,
                subject.cyan(),
                occurrence.message,
                occurrence.code,
            ));
            for (key, value) in &occurrence.metadata {
                output.push_str(&format!("  {}: {}\n", key, value));
            }
        }
    }

    if count == 0 {
        output.push_str("No findings.\n");
    } else {
        output.push_str(&format!(
            "\nFound {} finding(s) in {} of {} audited object(s).\n",
            count,
            results.len(),
            summary.targets_audited
        ));
    }
    if summary.objects_skipped > 0 {
        output.push_str(&format!(
            "Skipped {} object(s) of unsupported kinds.\n",
            summary.objects_skipped
        ));
    }

    output
}
