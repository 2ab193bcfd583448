//! Privilege escalation rule.

use super::apply_override;
use crate::audit::normalize::AuditTarget;
use crate::audit::overrides::OverrideResolver;
use crate::audit::types::{AuditResult, FindingCode, Occurrence};

pub const NAME: &str = "privilege-escalation";

const OVERRIDE_KEY: &str = "allow-privilege-escalation";

/// Flags containers that do not set `allowPrivilegeEscalation: false`.
pub fn audit_privilege_escalation(
    resolver: &OverrideResolver,
    target: &AuditTarget,
) -> Vec<AuditResult> {
    let Some(pod_spec) = target.pod_spec() else {
        return Vec::new();
    };
    let mut result = target.new_result();

    for container in pod_spec.all_containers() {
        let allowed = container
            .security_context
            .as_ref()
            .and_then(|sc| sc.allow_privilege_escalation);
        let occurrence = match allowed {
            Some(false) => continue,
            Some(true) => Occurrence::error(
                FindingCode::AllowPrivilegeEscalationTrue,
                "allowPrivilegeEscalation is set to true in the container security context",
            ),
            None => Occurrence::error(
                FindingCode::AllowPrivilegeEscalationNil,
                "allowPrivilegeEscalation is not set in the container security context, it defaults to true",
            ),
        };
        let found = resolver.container_override(&result, &container.name, OVERRIDE_KEY);
        result.push(
            apply_override(occurrence, found, FindingCode::AllowPrivilegeEscalationAllowed)
                .in_container(container.name.as_str()),
        );
    }

    result.into_results()
}
