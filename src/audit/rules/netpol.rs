//! Default-deny network policy rule.
//!
//! A namespace is covered in one direction when it holds a policy that
//! selects every pod, applies to that direction and allows nothing.

use super::apply_override;
use crate::audit::context::NetworkPolicyData;
use crate::audit::normalize::AuditTarget;
use crate::audit::overrides::{NetworkPolicyType, OverrideResolver};
use crate::audit::types::{AuditResult, FindingCode, KubeType, Occurrence};
use std::collections::HashMap;

pub const NAME: &str = "network-policies";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DefaultDeny {
    ingress: bool,
    egress: bool,
}

/// Default-deny coverage per namespace.
#[derive(Debug, Clone, Default)]
pub struct NetworkPolicyIndex {
    namespaces: HashMap<String, DefaultDeny>,
}

impl NetworkPolicyIndex {
    pub fn new<'a>(policies: impl IntoIterator<Item = &'a NetworkPolicyData>) -> Self {
        let mut namespaces: HashMap<String, DefaultDeny> = HashMap::new();
        for policy in policies {
            let entry = namespaces
                .entry(policy.metadata.namespace.clone())
                .or_default();
            entry.ingress |= denies(policy, NetworkPolicyType::Ingress);
            entry.egress |= denies(policy, NetworkPolicyType::Egress);
        }
        Self { namespaces }
    }

    pub fn has_default_deny(&self, namespace: &str, policy_type: NetworkPolicyType) -> bool {
        self.namespaces
            .get(namespace)
            .is_some_and(|deny| match policy_type {
                NetworkPolicyType::Ingress => deny.ingress,
                NetworkPolicyType::Egress => deny.egress,
            })
    }
}

fn denies(policy: &NetworkPolicyData, policy_type: NetworkPolicyType) -> bool {
    if !policy.pod_selector.is_empty() {
        return false;
    }
    // Without policyTypes a policy always covers ingress.
    let applies = if policy.policy_types.is_empty() {
        policy_type == NetworkPolicyType::Ingress
    } else {
        policy.policy_types.iter().any(|t| t == policy_type.as_str())
    };
    let rules = match policy_type {
        NetworkPolicyType::Ingress => policy.ingress_rules,
        NetworkPolicyType::Egress => policy.egress_rules,
    };
    applies && rules == 0
}

/// Flags namespaces without default-deny ingress and egress policies.
pub fn audit_network_policies(
    index: &NetworkPolicyIndex,
    resolver: &OverrideResolver,
    target: &AuditTarget,
) -> Vec<AuditResult> {
    if target.kube_type() != KubeType::Namespace {
        return Vec::new();
    }
    let namespace = target.name();
    let mut result = target.new_result();

    for (policy_type, missing, allowed) in [
        (
            NetworkPolicyType::Ingress,
            FindingCode::MissingDefaultDenyIngressNetworkPolicy,
            FindingCode::MissingDefaultDenyIngressNetworkPolicyAllowed,
        ),
        (
            NetworkPolicyType::Egress,
            FindingCode::MissingDefaultDenyEgressNetworkPolicy,
            FindingCode::MissingDefaultDenyEgressNetworkPolicyAllowed,
        ),
    ] {
        if index.has_default_deny(namespace, policy_type) {
            continue;
        }
        let occurrence = Occurrence::error(
            missing,
            format!(
                "Namespace is missing a default deny {} NetworkPolicy",
                policy_type.as_str().to_lowercase()
            ),
        );
        let found = resolver.namespace_override(&result, namespace, policy_type);
        result.push(apply_override(occurrence, found, allowed));
    }

    result.into_results()
}
