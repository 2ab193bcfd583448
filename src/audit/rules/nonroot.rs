//! Non-root enforcement rule.

use super::apply_override;
use crate::audit::normalize::AuditTarget;
use crate::audit::overrides::{OverrideResolver, should_evaluate_container_security_context};
use crate::audit::types::{AuditResult, FindingCode, Occurrence};

pub const NAME: &str = "non-root";

const OVERRIDE_KEY: &str = "allow-run-as-root";

/// Flags pods and containers not forced to run as a non-root user.
pub fn audit_run_as_non_root(resolver: &OverrideResolver, target: &AuditTarget) -> Vec<AuditResult> {
    let Some(pod_spec) = target.pod_spec() else {
        return Vec::new();
    };
    let mut result = target.new_result();

    let pod_run_as_non_root = pod_spec
        .security_context
        .as_ref()
        .and_then(|sc| sc.run_as_non_root);
    if pod_run_as_non_root == Some(false) {
        let occurrence = Occurrence::error(
            FindingCode::RunAsNonRootPodFalse,
            "runAsNonRoot is set to false in the pod security context",
        );
        let found = resolver.pod_override(&result, OVERRIDE_KEY);
        result.push(apply_override(occurrence, found, FindingCode::RunAsNonRootAllowed));
    }

    for container in pod_spec.all_containers() {
        if !should_evaluate_container_security_context(pod_spec, container) {
            continue;
        }
        let run_as_non_root = container
            .security_context
            .as_ref()
            .and_then(|sc| sc.run_as_non_root);
        let occurrence = match run_as_non_root {
            Some(true) => continue,
            Some(false) => Occurrence::error(
                FindingCode::RunAsNonRootFalse,
                "runAsNonRoot is set to false in the container security context",
            ),
            None => Occurrence::error(
                FindingCode::RunAsNonRootNil,
                "runAsNonRoot is not set in the container or pod security context",
            ),
        };
        let found = resolver.container_override(&result, &container.name, OVERRIDE_KEY);
        result.push(
            apply_override(occurrence, found, FindingCode::RunAsNonRootAllowed)
                .in_container(container.name.as_str()),
        );
    }

    result.into_results()
}
