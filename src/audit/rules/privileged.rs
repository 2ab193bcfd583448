//! Privileged container rule.

use super::apply_override;
use crate::audit::normalize::AuditTarget;
use crate::audit::overrides::OverrideResolver;
use crate::audit::types::{AuditResult, FindingCode, Occurrence};

pub const NAME: &str = "privileged";

const OVERRIDE_KEY: &str = "allow-privileged";

/// Flags containers running privileged. An unset flag defaults to
/// unprivileged and is only a warning.
pub fn audit_privileged(resolver: &OverrideResolver, target: &AuditTarget) -> Vec<AuditResult> {
    let Some(pod_spec) = target.pod_spec() else {
        return Vec::new();
    };
    let mut result = target.new_result();

    for container in pod_spec.all_containers() {
        let privileged = container
            .security_context
            .as_ref()
            .and_then(|sc| sc.privileged);
        let occurrence = match privileged {
            Some(false) => continue,
            Some(true) => {
                let occurrence = Occurrence::error(
                    FindingCode::PrivilegedTrue,
                    "privileged is set to true in the container security context",
                );
                let found = resolver.container_override(&result, &container.name, OVERRIDE_KEY);
                apply_override(occurrence, found, FindingCode::PrivilegedTrueAllowed)
            }
            None => Occurrence::warning(
                FindingCode::PrivilegedNil,
                "privileged is not set in the container security context, it defaults to false",
            ),
        };
        result.push(occurrence.in_container(container.name.as_str()));
    }

    result.into_results()
}
