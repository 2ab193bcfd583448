//! JSON formatter.

use crate::audit::runner::AuditSummary;
use crate::audit::types::AuditResult;
use serde::Serialize;

/// Format results as JSON.
pub fn format(results: &[AuditResult], summary: &AuditSummary) -> serde_json::Result<String> {
    let output = JsonOutput {
        results,
        summary: JsonSummary {
            objects_loaded: summary.objects_loaded,
            targets_audited: summary.targets_audited,
            objects_skipped: summary.objects_skipped,
            rules_run: summary.rules_run,
            total_findings: results.iter().map(|r| r.occurrences.len()).sum(),
        },
    };
    let mut json = serde_json::to_string_pretty(&output)?;
    json.push('\n');
    Ok(json)
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    results: &'a [AuditResult],
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonSummary {
    objects_loaded: usize,
    targets_audited: usize,
    objects_skipped: usize,
    rules_run: usize,
    total_findings: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::types::{FindingCode, KubeType, Occurrence};
    use std::collections::BTreeMap;

    #[test]
    fn test_json_output() {
        let mut result = AuditResult::new(KubeType::DaemonSet, "agent", "kube-system", BTreeMap::new());
        result.token = Some(false);
        result.push(Occurrence::error(FindingCode::RunAsNonRootNil, "root").in_container("agent"));

        let json = format(&[result], &AuditSummary::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let first = &value["results"][0];
        assert_eq!(first["KubeType"], "daemonSet");
        assert_eq!(first["Name"], "agent");
        assert_eq!(first["Token"], false);
        assert!(first.get("SA").is_none());
        assert_eq!(first["Occurrences"][0]["code"], "RunAsNonRootNil");
        assert_eq!(first["Occurrences"][0]["severity"], "error");
        assert_eq!(value["summary"]["total_findings"], 1);
    }
}
