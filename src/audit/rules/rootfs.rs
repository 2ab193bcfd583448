//! Read-only root filesystem rule.

use super::apply_override;
use crate::audit::normalize::AuditTarget;
use crate::audit::overrides::OverrideResolver;
use crate::audit::types::{AuditResult, FindingCode, Occurrence};

pub const NAME: &str = "read-only-root-filesystem";

const OVERRIDE_KEY: &str = "allow-read-only-root-filesystem-false";

pub fn audit_read_only_root_filesystem(
    resolver: &OverrideResolver,
    target: &AuditTarget,
) -> Vec<AuditResult> {
    let Some(pod_spec) = target.pod_spec() else {
        return Vec::new();
    };
    let mut result = target.new_result();

    for container in pod_spec.all_containers() {
        let read_only = container
            .security_context
            .as_ref()
            .and_then(|sc| sc.read_only_root_filesystem);
        let occurrence = match read_only {
            Some(true) => continue,
            Some(false) => Occurrence::error(
                FindingCode::ReadOnlyRootFilesystemFalse,
                "readOnlyRootFilesystem is set to false in the container security context",
            ),
            None => Occurrence::error(
                FindingCode::ReadOnlyRootFilesystemNil,
                "readOnlyRootFilesystem is not set in the container security context",
            ),
        };
        let found = resolver.container_override(&result, &container.name, OVERRIDE_KEY);
        result.push(
            apply_override(occurrence, found, FindingCode::ReadOnlyRootFilesystemFalseAllowed)
                .in_container(container.name.as_str()),
        );
    }

    result.into_results()
}
