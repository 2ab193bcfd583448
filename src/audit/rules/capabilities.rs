//! Linux capabilities rule.

use super::apply_override;
use crate::audit::capabilities::CapabilitySet;
use crate::audit::normalize::AuditTarget;
use crate::audit::overrides::OverrideResolver;
use crate::audit::types::{AuditResult, FindingCode, Occurrence};
use crate::config::DEFAULT_DROP_CAPABILITIES;

pub const NAME: &str = "capabilities";

/// Flags capabilities that are added, or that the policy wants dropped
/// but the container keeps.
pub fn audit_capabilities(resolver: &OverrideResolver, target: &AuditTarget) -> Vec<AuditResult> {
    let Some(pod_spec) = target.pod_spec() else {
        return Vec::new();
    };
    let policy = match resolver.config() {
        Some(config) => CapabilitySet::from_list(config.drop_capabilities()),
        None => CapabilitySet::from_list(DEFAULT_DROP_CAPABILITIES.iter().copied()),
    };
    let mut result = target.new_result();

    for container in pod_spec.all_containers() {
        let (added, dropped) = match container
            .security_context
            .as_ref()
            .and_then(|sc| sc.capabilities.as_ref())
        {
            Some(caps) => (
                CapabilitySet::from_list(caps.add.iter().cloned()),
                CapabilitySet::from_list(caps.drop.iter().cloned()),
            ),
            None => (CapabilitySet::new(), CapabilitySet::new()),
        };

        let not_dropped: CapabilitySet = if dropped.contains_ignore_case("ALL") {
            CapabilitySet::new()
        } else {
            policy.iter().filter(|cap| !dropped.contains(cap)).collect()
        };

        for cap in CapabilitySet::merge([&added, &not_dropped]).sorted() {
            let occurrence = if added.contains(&cap) {
                Occurrence::error(
                    FindingCode::CapabilityAdded,
                    format!("Capability added: {}", cap),
                )
            } else {
                Occurrence::error(
                    FindingCode::CapabilityNotDropped,
                    format!("Capability not dropped: {}", cap),
                )
            };
            let found = resolver.capability_override(&result, &container.name, &cap);
            result.push(
                apply_override(occurrence, found, FindingCode::CapabilityAllowed)
                    .in_container(container.name.as_str())
                    .with_metadata("Capability", cap),
            );
        }
    }

    result.into_results()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::rules::test_support::targets;
    use crate::audit::types::Severity;
    use crate::config::KubeauditConfig;
    use std::sync::Arc;

    fn audit(resolver: &OverrideResolver, manifest: &str) -> Vec<AuditResult> {
        targets(manifest)
            .iter()
            .flat_map(|t| audit_capabilities(resolver, t))
            .collect()
    }

    fn capabilities(result: &AuditResult) -> Vec<String> {
        result
            .occurrences
            .iter()
            .filter_map(|o| o.metadata.get("Capability").cloned())
            .collect()
    }

    const DROPS_ALL_ADDS_TWO: &str = r#"
apiVersion: v1
kind: Pod
metadata:
  name: p
  labels:
    audit.kubernetes.io/pod/allow-capability-NET-ADMIN: "vpn"
spec:
  containers:
    - name: web
      securityContext:
        capabilities:
          add: ["SYS_TIME", "NET_ADMIN"]
          drop: ["all"]
"#;

    #[test]
    fn test_added_capabilities_sorted() {
        let results = audit(&OverrideResolver::default(), DROPS_ALL_ADDS_TWO);
        assert_eq!(results.len(), 1);
        assert_eq!(capabilities(&results[0]), vec!["NET_ADMIN", "SYS_TIME"]);

        let net_admin = &results[0].occurrences[0];
        assert_eq!(net_admin.code, FindingCode::CapabilityAllowed);
        assert_eq!(net_admin.severity, Severity::Warning);
        assert_eq!(net_admin.metadata.get("Reason").map(String::as_str), Some("vpn"));

        let sys_time = &results[0].occurrences[1];
        assert_eq!(sys_time.code, FindingCode::CapabilityAdded);
        assert_eq!(sys_time.severity, Severity::Error);
    }

    #[test]
    fn test_default_policy_requires_drops() {
        let manifest = "apiVersion: v1\nkind: Pod\nmetadata:\n  name: p\nspec:\n  containers:\n    - name: web\n";
        let results = audit(&OverrideResolver::default(), manifest);
        assert_eq!(capabilities(&results[0]).len(), DEFAULT_DROP_CAPABILITIES.len());
        assert!(
            results[0]
                .occurrences
                .iter()
                .all(|o| o.code == FindingCode::CapabilityNotDropped)
        );
    }

    #[test]
    fn test_config_capability_policy() {
        let config = KubeauditConfig::load_from_str(
            "spec:\n  capabilities:\n    NET_RAW: drop\n    CHOWN: keep\n",
        )
        .unwrap();
        let resolver = OverrideResolver::new(Some(Arc::new(config)));
        let manifest = "apiVersion: v1\nkind: Pod\nmetadata:\n  name: p\nspec:\n  containers:\n    - name: web\n";
        let results = audit(&resolver, manifest);
        assert_eq!(capabilities(&results[0]), vec!["NET_RAW"]);

        let dropped = r#"
apiVersion: v1
kind: Pod
metadata:
  name: p
spec:
  containers:
    - name: web
      securityContext:
        capabilities:
          drop: ["NET_RAW"]
"#;
        assert!(audit(&resolver, dropped).is_empty());
    }
}
