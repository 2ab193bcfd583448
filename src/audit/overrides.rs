//! Override resolution.
//!
//! A finding is suppressed by the first override found, checking
//! container labels, then pod labels, then namespace labels (for
//! namespace-scoped rules), then the global config file. Label values are
//! the override reason; any non-empty value counts as an allow.

use crate::audit::context::object::ContainerSpec;
use crate::audit::context::PodSpec;
use crate::audit::types::AuditResult;
use crate::config::{KubeauditConfig, OverrideField, OverridePolicy};
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Prefix of container-scoped override labels.
pub const CONTAINER_LABEL_PREFIX: &str = "container.audit.kubernetes.io";

/// Prefix of pod-scoped override labels.
pub const POD_LABEL_PREFIX: &str = "audit.kubernetes.io/pod";

/// Prefix of namespace-scoped override labels.
pub const NAMESPACE_LABEL_PREFIX: &str = "audit.kubernetes.io";

/// Where an override was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideScope {
    Container,
    Pod,
    Namespace,
    Config,
}

impl fmt::Display for OverrideScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Container => "container",
            Self::Pod => "pod",
            Self::Namespace => "namespace",
            Self::Config => "config",
        };
        write!(f, "{}", s)
    }
}

/// A matched override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    pub scope: OverrideScope,
    pub reason: String,
}

impl Override {
    fn new(scope: OverrideScope, reason: impl Into<String>) -> Self {
        Self {
            scope,
            reason: reason.into(),
        }
    }

    /// The reason as shown in reports.
    pub fn display_reason(&self) -> String {
        prettify_reason(&self.reason)
    }
}

/// Direction of a default-deny network policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkPolicyType {
    Ingress,
    Egress,
}

impl NetworkPolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingress => "Ingress",
            Self::Egress => "Egress",
        }
    }

    pub fn override_key(&self) -> &'static str {
        match self {
            Self::Ingress => "allow-non-default-deny-ingress-network-policy",
            Self::Egress => "allow-non-default-deny-egress-network-policy",
        }
    }
}

/// Render a raw override reason; a bare `true` has no explanation.
pub fn prettify_reason(reason: &str) -> String {
    if reason.eq_ignore_ascii_case("true") {
        "Unspecified".to_string()
    } else {
        reason.to_string()
    }
}

/// Whether a container's own non-root setting needs checking.
///
/// A pod-level `runAsNonRoot` covers every container that does not set
/// its own.
pub fn should_evaluate_container_security_context(
    pod_spec: &PodSpec,
    container: &ContainerSpec,
) -> bool {
    let container_sets = container
        .security_context
        .as_ref()
        .is_some_and(|sc| sc.run_as_non_root.is_some());
    let pod_sets = pod_spec
        .security_context
        .as_ref()
        .is_some_and(|sc| sc.run_as_non_root.is_some());
    container_sets || !pod_sets
}

/// Resolves overrides against result labels and the global config.
#[derive(Debug, Clone, Default)]
pub struct OverrideResolver {
    config: Option<Arc<KubeauditConfig>>,
}

impl OverrideResolver {
    pub fn new(config: Option<Arc<KubeauditConfig>>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> Option<&KubeauditConfig> {
        self.config.as_deref()
    }

    /// Container label, then pod label, then global config.
    pub fn container_override(
        &self,
        result: &AuditResult,
        container: &str,
        key: &str,
    ) -> Option<Override> {
        let label = format!("{}/{}/{}", CONTAINER_LABEL_PREFIX, container, key);
        label_reason(result, &label)
            .map(|reason| Override::new(OverrideScope::Container, reason))
            .or_else(|| self.pod_override(result, key))
    }

    /// Pod label, then global config.
    pub fn pod_override(&self, result: &AuditResult, key: &str) -> Option<Override> {
        let label = format!("{}/{}", POD_LABEL_PREFIX, key);
        label_reason(result, &label)
            .map(|reason| Override::new(OverrideScope::Pod, reason))
            .or_else(|| self.config_override(key))
    }

    /// Namespace label, then global config.
    pub fn namespace_override(
        &self,
        result: &AuditResult,
        namespace: &str,
        policy_type: NetworkPolicyType,
    ) -> Option<Override> {
        let key = policy_type.override_key();
        let label = format!("{}/{}/{}", NAMESPACE_LABEL_PREFIX, namespace, key);
        label_reason(result, &label)
            .map(|reason| Override::new(OverrideScope::Namespace, reason))
            .or_else(|| self.config_override(key))
    }

    /// Container label, then pod label. The config file has no tier for
    /// capabilities.
    pub fn capability_override(
        &self,
        result: &AuditResult,
        container: &str,
        capability: &str,
    ) -> Option<Override> {
        let key = format!("allow-capability-{}", capability.replace('_', "-"));
        let container_label = format!("{}/{}/{}", CONTAINER_LABEL_PREFIX, container, key);
        if let Some(reason) = label_reason(result, &container_label) {
            return Some(Override::new(OverrideScope::Container, reason));
        }
        let pod_label = format!("{}/{}", POD_LABEL_PREFIX, key);
        label_reason(result, &pod_label).map(|reason| Override::new(OverrideScope::Pod, reason))
    }

    /// The global config tier on its own.
    pub fn config_override(&self, key: &str) -> Option<Override> {
        let config = self.config.as_ref()?;
        let field = OverrideField::from_override_key(key)?;
        let policy = config.override_policy(field)?;
        debug!("Config override {} is {:?} for {}", field.field_name(), policy, key);
        match policy {
            OverridePolicy::Allow => Some(Override::new(
                OverrideScope::Config,
                format!("Allowed {} in kubeauditConfig", key),
            )),
            OverridePolicy::Deny => None,
        }
    }
}

fn label_reason<'a>(result: &'a AuditResult, label: &str) -> Option<&'a str> {
    result
        .labels
        .get(label)
        .map(String::as_str)
        .filter(|reason| !reason.is_empty())
}
